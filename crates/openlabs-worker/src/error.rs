use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("store error: {0}")]
    Store(#[from] openlabs_store::StoreError),

    #[error("provisioner error: {0}")]
    Provisioner(#[from] openlabs_provisioner::error::ProvisionerError),

    #[error("vault error: {0}")]
    Vault(#[from] openlabs_vault::VaultError),

    #[error("queue error: {0}")]
    Queue(#[from] openlabs_queue::QueueError),

    #[error("blueprint {0} not found or not owned by the requesting user")]
    BlueprintNotOwned(uuid::Uuid),

    #[error("deployed range {0} not found or not owned by the requesting user")]
    RangeNotOwned(uuid::Uuid),

    #[error("deployed range has no state blob to destroy")]
    MissingState,
}
