use async_trait::async_trait;
use uuid::Uuid;

/// Hook de diagnóstico adjunto a un batch.
///
/// `before_cleanup` corre exactamente una vez por batch, después de detener
/// los procesos en segundo plano y antes de los steps de cleanup, falle o no
/// el batch. Debe tolerar que el namespace ya esté parcialmente borrado.
#[async_trait]
pub trait BatchHook: Send + Sync {
    async fn before_cleanup(&self, batch_id: Uuid, failed: bool);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

#[async_trait]
impl BatchHook for NoopHook {
    async fn before_cleanup(&self, _batch_id: Uuid, _failed: bool) {}
}
