// Effects run on tokio tasks and report back through the TUI channel.

use tokio::sync::mpsc;

use crate::api::ApiClient;
use crate::catalog::{CatalogSource, load_catalog};
use crate::orchestrator::{ChatPayload, send};
use crate::tui::types::{Effect, TuiMsg};

pub fn spawn_effect(
    api: &ApiClient,
    source: &CatalogSource,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    effect: Effect,
) {
    match effect {
        Effect::FetchCatalog { category } => {
            spawn_catalog_fetch(api.clone(), source.clone(), tx.clone(), category)
        }
        Effect::SendChat(payload) => spawn_chat_request(api.clone(), tx.clone(), payload),
    }
}

pub fn spawn_catalog_fetch(
    api: ApiClient,
    source: CatalogSource,
    tx: mpsc::UnboundedSender<TuiMsg>,
    category: Option<String>,
) {
    tokio::spawn(async move {
        let result = load_catalog(&source, &api).await;
        let _ = tx.send(TuiMsg::Catalog { category, result });
    });
}

pub fn spawn_chat_request(
    api: ApiClient,
    tx: mpsc::UnboundedSender<TuiMsg>,
    payload: ChatPayload,
) {
    tokio::spawn(async move {
        let res = send(&api, &payload).await;
        let _ = tx.send(TuiMsg::Chat(res));
    });
}
