use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::RepositoryResult;
use crate::models::TranslationConfigRecord;
use crate::repositories::TranslationConfigRepository;

#[derive(Default)]
pub struct InMemoryTranslationConfigRepository {
    configs: DashMap<String, TranslationConfigRecord>,
}

impl InMemoryTranslationConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, record: TranslationConfigRecord) {
        self.configs.insert(record.provider_name.clone(), record);
    }
}

#[async_trait]
impl TranslationConfigRepository for InMemoryTranslationConfigRepository {
    async fn find_all_enabled(&self) -> RepositoryResult<Vec<TranslationConfigRecord>> {
        let mut enabled: Vec<TranslationConfigRecord> = self
            .configs
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.clone())
            .collect();
        enabled.sort_by(|a, b| a.provider_name.cmp(&b.provider_name));
        Ok(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_enabled_providers_are_returned_sorted() {
        let repo = InMemoryTranslationConfigRepository::new();
        repo.upsert(TranslationConfigRecord {
            provider_name: "zeta".to_string(),
            priority: 10,
            enabled: true,
            config: serde_json::json!({}),
        });
        repo.upsert(TranslationConfigRecord {
            provider_name: "alpha".to_string(),
            priority: 5,
            enabled: true,
            config: serde_json::json!({}),
        });
        repo.upsert(TranslationConfigRecord {
            provider_name: "disabled".to_string(),
            priority: 1,
            enabled: false,
            config: serde_json::json!({}),
        });
        let enabled = repo.find_all_enabled().await.unwrap();
        let names: Vec<&str> = enabled.iter().map(|r| r.provider_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
