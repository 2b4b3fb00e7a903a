use crate::domain::model::{ChatMessage, Lead};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 生成式語言模型的對話後端
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn generate(&self, system_instruction: &str, history: &[ChatMessage]) -> Result<String>;
}

#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn submit(&self, lead: &Lead) -> Result<()>;
}
