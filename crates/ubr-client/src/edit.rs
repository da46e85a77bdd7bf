//! Hand-off to the host's own block editor.
//!
//! Editing happens entirely inside the host's admin screen, framed at a
//! same-origin URL. The client does not know what changed, so closing the
//! session always reloads the page's sections.

use tracing::{debug, warn};
use ubr_types::SectionId;
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::modal::ModalLifecycle;
use crate::store::{LoadOutcome, PageSectionStore, StoreError};

const EDIT_PATH: &str = "wp-admin/post.php";

#[derive(Clone, Debug)]
pub struct EditSession {
    site: Url,
    modal: ModalLifecycle,
    section: Option<SectionId>,
}

impl EditSession {
    /// `site` must end with `/` for the admin path to stay under it.
    pub fn new(site: Url) -> Self {
        Self {
            site,
            modal: ModalLifecycle::new(),
            section: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.site()?))
    }

    /// `{site}/wp-admin/post.php?post={id}&action=edit&edit-block=true`
    pub fn edit_url(&self, id: &SectionId) -> Result<Url, url::ParseError> {
        let mut url = self.site.join(EDIT_PATH)?;
        url.query_pairs_mut()
            .append_pair("post", id.as_str())
            .append_pair("action", "edit")
            .append_pair("edit-block", "true");
        Ok(url)
    }

    pub fn open(&mut self, id: SectionId) -> Result<Url, url::ParseError> {
        let url = self.edit_url(&id)?;
        debug!(section = %id, %url, "opening editor");
        self.section = Some(id);
        self.modal.open();
        Ok(url)
    }

    pub fn is_open(&self) -> bool {
        self.modal.is_open()
    }

    pub fn section(&self) -> Option<&SectionId> {
        self.section.as_ref().filter(|_| self.is_open())
    }

    pub fn url(&self) -> Option<Url> {
        self.section().and_then(|id| self.edit_url(id).ok())
    }

    /// Accessible title of the framed editor.
    pub fn frame_title(&self) -> Option<String> {
        self.section().map(|id| format!("Edit Block {id}"))
    }

    pub fn modal_mut(&mut self) -> &mut ModalLifecycle {
        &mut self.modal
    }

    /// Close the editor and pick up whatever it changed.
    ///
    /// `None` if no editor was open.
    pub async fn close(
        &mut self,
        store: &PageSectionStore,
    ) -> Option<Result<LoadOutcome, StoreError>> {
        if !self.is_open() {
            return None;
        }
        self.modal.close();
        let section = self.section.take();
        let result = store.load().await;
        if let Err(error) = &result {
            warn!(section = ?section, %error, "reload after edit failed");
        }
        Some(result)
    }
}
