use std::sync::Arc;

use aware_core::model::{Assessment, AssessmentId, LearningModule, ModuleDraft, ModuleId};
use serde::Serialize;
use storage::repository::{AssessmentRepository, ModuleRepository, StorageError};
use tracing::info;

use crate::Clock;
use crate::error::ModuleServiceError;

/// What a learner sees about a module's quiz before starting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentSummary {
    pub id: AssessmentId,
    pub title: String,
    pub passing_score: u32,
    pub time_limit_secs: Option<u32>,
    pub question_count: usize,
}

impl From<&Assessment> for AssessmentSummary {
    fn from(a: &Assessment) -> Self {
        Self {
            id: a.id(),
            title: a.title().to_string(),
            passing_score: a.passing_score(),
            time_limit_secs: a.time_limit_secs(),
            question_count: a.questions().len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModuleDetail {
    pub module: LearningModule,
    pub assessment: Option<AssessmentSummary>,
}

/// Catalog reads and author-side module edits.
#[derive(Clone)]
pub struct ModuleService {
    clock: Clock,
    modules: Arc<dyn ModuleRepository>,
    assessments: Arc<dyn AssessmentRepository>,
}

impl ModuleService {
    #[must_use]
    pub fn new(
        clock: Clock,
        modules: Arc<dyn ModuleRepository>,
        assessments: Arc<dyn AssessmentRepository>,
    ) -> Self {
        Self {
            clock,
            modules,
            assessments,
        }
    }

    /// All modules in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::Storage` if repository access fails.
    pub async fn list(&self) -> Result<Vec<LearningModule>, ModuleServiceError> {
        Ok(self.modules.list_modules().await?)
    }

    /// Returns `Ok(None)` when the module does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::Storage` if repository access fails.
    pub async fn get(&self, id: ModuleId) -> Result<Option<ModuleDetail>, ModuleServiceError> {
        let Some(module) = self.modules.get_module(id).await? else {
            return Ok(None);
        };
        let assessment = self
            .assessments
            .assessment_for_module(id)
            .await?
            .as_ref()
            .map(AssessmentSummary::from);
        Ok(Some(ModuleDetail { module, assessment }))
    }

    /// # Errors
    ///
    /// Returns `ModuleServiceError::Module` for validation failures.
    /// Returns `ModuleServiceError::Storage` if persistence fails.
    pub async fn create(&self, draft: ModuleDraft) -> Result<LearningModule, ModuleServiceError> {
        let now = self.clock.now();
        LearningModule::new(ModuleId::new(0), draft.clone(), now)?;
        let module = self.modules.insert_module(draft, now).await?;
        info!(module_id = %module.id(), title = module.title(), "created module");
        Ok(module)
    }

    /// Replace the author-editable fields of a module.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::Module` for validation failures.
    /// Returns `ModuleServiceError::Storage` if the module is missing or
    /// persistence fails.
    pub async fn update(
        &self,
        id: ModuleId,
        draft: ModuleDraft,
    ) -> Result<LearningModule, ModuleServiceError> {
        let mut module = self
            .modules
            .get_module(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        module.apply_draft(draft, self.clock.now())?;
        self.modules.update_module(&module).await?;
        info!(module_id = %id, "updated module");
        Ok(module)
    }

    /// Delete a module along with its assessment and learner progress.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::Storage` if the module is missing or
    /// persistence fails.
    pub async fn delete(&self, id: ModuleId) -> Result<(), ModuleServiceError> {
        self.modules.delete_module(id).await?;
        info!(module_id = %id, "deleted module");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aware_core::model::{Difficulty, ModuleError};
    use aware_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn draft(title: &str, order_index: u32) -> ModuleDraft {
        ModuleDraft {
            title: title.into(),
            description: String::new(),
            difficulty: Difficulty::Beginner,
            content: "# Intro".into(),
            order_index,
            section_count: 3,
            points: 100,
        }
    }

    fn service() -> ModuleService {
        let repo = Arc::new(InMemoryRepository::new());
        ModuleService::new(Clock::fixed(fixed_now()), repo.clone(), repo)
    }

    #[tokio::test]
    async fn list_follows_order_index() {
        let modules = service();
        modules.create(draft("Safe Browsing", 4)).await.unwrap();
        modules.create(draft("Phishing", 1)).await.unwrap();
        modules.create(draft("Passwords", 2)).await.unwrap();

        let titles: Vec<String> = modules
            .list()
            .await
            .unwrap()
            .iter()
            .map(|m| m.title().to_string())
            .collect();
        assert_eq!(titles, ["Phishing", "Passwords", "Safe Browsing"]);
    }

    #[tokio::test]
    async fn update_validates_and_persists() {
        let modules = service();
        let created = modules.create(draft("Phishing", 1)).await.unwrap();

        let err = modules.update(created.id(), draft("  ", 1)).await.unwrap_err();
        assert!(matches!(err, ModuleServiceError::Module(ModuleError::EmptyTitle)));

        modules
            .update(created.id(), draft("Phishing 101", 1))
            .await
            .unwrap();
        let detail = modules.get(created.id()).await.unwrap().unwrap();
        assert_eq!(detail.module.title(), "Phishing 101");
        assert!(detail.assessment.is_none());
    }

    #[tokio::test]
    async fn missing_modules_are_none_or_not_found() {
        let modules = service();
        assert!(modules.get(ModuleId::new(99)).await.unwrap().is_none());
        assert!(matches!(
            modules.delete(ModuleId::new(99)).await,
            Err(ModuleServiceError::Storage(StorageError::NotFound))
        ));
    }
}
