//! Answer-browser collaborator
//!
//! Answer-scoped annotations only make sense against the answer they were
//! made on. [`AnswerBrowser`] reports and switches the answer a paragraph
//! displays; [`AnswerCatalog`] is an in-process implementation that renders
//! answer text straight into the document.

use dashmap::DashMap;
use parking_lot::RwLock;
use velp_tree::ParId;

use crate::error::AnswerError;
use crate::scope::DocumentHandle;
use crate::types::{AnswerId, UserId};

/// Displays submitted answers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AnswerBrowser: Send + Sync {
    /// Answer currently shown in a paragraph
    fn displayed_answer(&self, par_id: &ParId) -> Option<AnswerId>;

    /// User whose answers are being reviewed
    fn reviewed_user(&self) -> Option<UserId>;

    /// Switch the reviewed user
    async fn change_user(&self, user: UserId) -> Result<(), AnswerError>;

    /// Show an answer in a paragraph
    async fn show_answer(&self, par_id: &ParId, answer: AnswerId) -> Result<(), AnswerError>;
}

/// Browser for documents without plugin answers
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnswers;

#[async_trait::async_trait]
impl AnswerBrowser for NoAnswers {
    fn displayed_answer(&self, _par_id: &ParId) -> Option<AnswerId> {
        None
    }

    fn reviewed_user(&self) -> Option<UserId> {
        None
    }

    async fn change_user(&self, _user: UserId) -> Result<(), AnswerError> {
        Ok(())
    }

    async fn show_answer(&self, par_id: &ParId, _answer: AnswerId) -> Result<(), AnswerError> {
        Err(AnswerError::NoBrowser(par_id.clone()))
    }
}

#[derive(Debug, Clone)]
struct StoredAnswer {
    par_id: ParId,
    user: UserId,
    text: String,
}

/// In-process answers rendered into the document's answer views
pub struct AnswerCatalog {
    document: DocumentHandle,
    answers: DashMap<AnswerId, StoredAnswer>,
    displayed: DashMap<ParId, AnswerId>,
    user: RwLock<Option<UserId>>,
}

impl AnswerCatalog {
    /// Create empty catalog for a document
    #[must_use]
    pub fn new(document: DocumentHandle) -> Self {
        Self {
            document,
            answers: DashMap::new(),
            displayed: DashMap::new(),
            user: RwLock::new(None),
        }
    }

    /// Register an answer of `user` in a paragraph
    #[must_use]
    pub fn with_answer(self, id: AnswerId, par_id: impl Into<ParId>, user: UserId, text: impl Into<String>) -> Self {
        self.answers.insert(
            id,
            StoredAnswer {
                par_id: par_id.into(),
                user,
                text: text.into(),
            },
        );
        self
    }

    /// Mark an answer as already displayed, without rendering it
    #[must_use]
    pub fn displaying(self, par_id: impl Into<ParId>, answer: AnswerId, user: UserId) -> Self {
        self.displayed.insert(par_id.into(), answer);
        *self.user.write() = Some(user);
        self
    }
}

impl std::fmt::Debug for AnswerCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerCatalog")
            .field("answers", &self.answers.len())
            .field("user", &*self.user.read())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl AnswerBrowser for AnswerCatalog {
    fn displayed_answer(&self, par_id: &ParId) -> Option<AnswerId> {
        self.displayed.get(par_id).map(|entry| *entry)
    }

    fn reviewed_user(&self) -> Option<UserId> {
        *self.user.read()
    }

    async fn change_user(&self, user: UserId) -> Result<(), AnswerError> {
        tracing::debug!(%user, "switching reviewed user");
        *self.user.write() = Some(user);
        Ok(())
    }

    async fn show_answer(&self, par_id: &ParId, answer: AnswerId) -> Result<(), AnswerError> {
        let stored = self
            .answers
            .get(&answer)
            .map(|entry| entry.clone())
            .ok_or(AnswerError::NotFound(answer))?;
        if stored.par_id != *par_id {
            return Err(AnswerError::SwitchFailed(format!(
                "answer {answer} belongs to paragraph '{}'",
                stored.par_id
            )));
        }

        self.document
            .write()
            .set_answer_text(par_id, &stored.text)
            .map_err(|err| AnswerError::SwitchFailed(err.to_string()))?;
        self.displayed.insert(par_id.clone(), answer);
        tracing::debug!(%par_id, %answer, user = %stored.user, "answer displayed");
        Ok(())
    }
}
