//! Model catalogue: registry entries joined with live provider probes.
//!
//! Shared by `GET /api/v1/ai/models` and `owpro models`.

use serde::Serialize;

use owpro_core::llm::router::RequestRouter;
use owpro_types::llm::{ModelDescriptor, ProbeResult, ProviderKind};

/// One registry entry plus where, and whether, it can be served right now.
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    #[serde(flatten)]
    pub descriptor: ModelDescriptor,
    pub available: bool,
    /// Provider that would serve the model now, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_by: Option<ProviderKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub models: Vec<ModelStatus>,
    pub providers: Vec<ProbeResult>,
}

/// Probe both providers and annotate every registered model.
///
/// `served_by` mirrors the router: a local model goes to the local provider
/// whenever it is up, else to the remote provider through an alias. It is
/// `available` only when the serving provider also lists it (an empty
/// listing counts as listing everything).
pub async fn model_catalog(router: &RequestRouter) -> Catalog {
    let providers = router.prober().probe_all().await;
    let probe = |kind: ProviderKind| providers.iter().find(|p| p.provider == kind);
    let up = |kind: ProviderKind| probe(kind).is_some_and(|p| p.available);

    let models = router
        .registry()
        .list()
        .iter()
        .map(|descriptor| {
            let served_by = match descriptor.provider_kind {
                ProviderKind::Local if up(ProviderKind::Local) => Some(ProviderKind::Local),
                _ if up(ProviderKind::Remote) => Some(ProviderKind::Remote),
                _ => None,
            };
            let available = match served_by {
                Some(ProviderKind::Local) => {
                    probe(ProviderKind::Local).is_some_and(|p| p.serves(&descriptor.id))
                }
                Some(ProviderKind::Remote) => match descriptor.provider_kind {
                    ProviderKind::Local => true,
                    ProviderKind::Remote => {
                        probe(ProviderKind::Remote).is_some_and(|p| p.serves(&descriptor.id))
                    }
                },
                None => false,
            };
            ModelStatus {
                descriptor: descriptor.clone(),
                available,
                served_by,
            }
        })
        .collect();

    Catalog { models, providers }
}
