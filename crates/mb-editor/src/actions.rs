//! Tool façades: paste, capture and generation.
//!
//! Each façade validates its input synchronously, reads the selection and
//! picks placement points, then either writes cards right away (paste,
//! capture) or hands a task to the queue (generation). Generation results are
//! written as they arrive, one store write per result, at successive points
//! of a placement cascade.

use futures::StreamExt;
use mb_core::geometry::{PlacementCascade, Point, Size, center_of};
use mb_core::id::CardId;
use mb_core::layout::{Viewport, viewport_center};
use mb_core::model::{CanvasItem, CardDraft};
use mb_core::selection;
use mb_core::store::CanvasStore;
use mb_core::{BoardConfig, Connection};
use mb_tasks::{
    CacheStore, CancellationToken, GenerationKind, GenerationOutput, GenerationRequest, Generator,
    Progress, Task, TaskError, TaskId, TaskQueue, TaskResult, fingerprint, tracked_generate,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Rejections raised before anything is submitted or written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("no credential configured for provider '{provider}'")]
    MissingCredential { provider: String },
    #[error("nothing to paste")]
    EmptyPaste,
}

/// One decoded clipboard/drop payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PastePayload {
    Image {
        #[serde(rename = "dataUrl")]
        data_url: String,
    },
    Text {
        text: String,
    },
}

/// Everything a façade needs. Cloning shares the same store, queue and
/// counters.
#[derive(Clone)]
pub struct Services {
    pub store: CanvasStore,
    pub queue: TaskQueue,
    pub progress: Progress,
    pub generator: Arc<dyn Generator>,
    pub cache: Arc<dyn CacheStore>,
    pub connection: Connection,
    pub config: Arc<BoardConfig>,
}

impl Services {
    pub fn new(
        config: BoardConfig,
        connection: Connection,
        generator: Arc<dyn Generator>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            store: CanvasStore::new(),
            queue: TaskQueue::with_history(config.task_history),
            progress: Progress::new(&config.status_separator),
            generator,
            cache,
            connection,
            config: Arc::new(config),
        }
    }

    /// Default card size for results of `kind`.
    pub fn card_size(&self, kind: GenerationKind) -> Size {
        match kind {
            GenerationKind::Text => self.config.text_card_size,
            GenerationKind::Image | GenerationKind::Video => self.config.image_card_size,
        }
    }
}

// ─── Paste / capture ─────────────────────────────────────────────────────

/// Add one card per payload, the first centered in the viewport and the rest
/// cascading from there.
pub fn paste(
    services: &Services,
    payloads: Vec<PastePayload>,
    viewport: Option<&Viewport>,
) -> Result<Vec<CardId>, ActionError> {
    if payloads.is_empty() {
        return Err(ActionError::EmptyPaste);
    }
    let config = &services.config;
    let center = viewport_center(viewport, config.fallback_center);
    let cascade = PlacementCascade::new(center, config.cascade_step);

    let ids: Vec<CardId> = payloads
        .into_iter()
        .zip(cascade)
        .map(|(payload, at)| {
            let draft = match payload {
                PastePayload::Image { data_url } => CardDraft::image(data_url, config.image_card_size),
                PastePayload::Text { text } => CardDraft::text(text, config.text_card_size),
            };
            services.store.add_card_centered(draft, at)
        })
        .collect();
    log::info!("pasted {} card(s)", ids.len());
    Ok(ids)
}

/// Add a captured photo as an image card in the middle of the viewport.
pub fn capture(
    services: &Services,
    data_url: impl Into<String>,
    viewport: Option<&Viewport>,
) -> Result<CardId, ActionError> {
    let data_url = data_url.into();
    if data_url.is_empty() {
        return Err(ActionError::EmptyPaste);
    }
    let ids = paste(services, vec![PastePayload::Image { data_url }], viewport)?;
    ids.into_iter().next().ok_or(ActionError::EmptyPaste)
}

// ─── Generation ──────────────────────────────────────────────────────────

/// Validate, then submit a generation task. Returns as soon as the task is
/// queued.
///
/// Results cascade from the center of the current selection, or from the
/// viewport center when nothing is selected. Bodies of selected text cards
/// are sent along as context.
pub fn generate(
    services: &Services,
    kind: GenerationKind,
    prompt: &str,
    viewport: Option<&Viewport>,
) -> Result<TaskId, ActionError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ActionError::EmptyPrompt);
    }
    if !services.connection.has_credential() {
        return Err(ActionError::MissingCredential {
            provider: services.connection.provider.clone(),
        });
    }

    let board = services.store.read();
    let picked: Vec<&CanvasItem> = selection::selected(&board).collect();
    let anchor = if picked.is_empty() {
        viewport_center(viewport, services.config.fallback_center)
    } else {
        center_of(picked.iter().copied())
    };
    let context: Vec<String> = picked.iter().filter_map(|item| item.body.clone()).collect();

    let request = GenerationRequest::new(kind, prompt, services.card_size(kind)).with_context(context);
    let name = format!("{kind}: {prompt}");
    let task_services = services.clone();
    let id = services.queue.submit(Task::new(name, move |token| {
        run_generation(task_services, request, anchor, token)
    }));
    Ok(id)
}

async fn run_generation(
    services: Services,
    request: GenerationRequest,
    anchor: Point,
    token: CancellationToken,
) -> TaskResult {
    let mut cascade = PlacementCascade::new(anchor, services.config.cascade_step);
    let key = fingerprint(
        request.kind,
        &services.connection.provider,
        request.size,
        &request.full_prompt(),
    );

    let cached = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(TaskError::Cancelled),
        hit = services.cache.get(&key) => hit,
    };
    if let Some(json) = cached {
        match serde_json::from_str::<Vec<GenerationOutput>>(&json) {
            Ok(outputs) => {
                log::debug!("cache hit for {key}: {} result(s)", outputs.len());
                for output in &outputs {
                    if token.is_cancelled() {
                        return Err(TaskError::Cancelled);
                    }
                    let at = cascade.next().unwrap_or(anchor);
                    place(&services, &request, output, at);
                }
                return Ok(());
            }
            Err(e) => log::warn!("ignoring unreadable cache entry {key}: {e}"),
        }
    }

    let mut stream = tracked_generate(
        services.generator.as_ref(),
        &services.progress,
        &services.connection,
        request.clone(),
        token.clone(),
    );
    let mut produced = Vec::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(TaskError::Cancelled),
            next = stream.next() => next,
        };
        let Some(result) = next else {
            break;
        };
        let output = result?;
        if token.is_cancelled() {
            return Err(TaskError::Cancelled);
        }
        let at = cascade.next().unwrap_or(anchor);
        let id = place(&services, &request, &output, at);
        if services.config.captions && matches!(output, GenerationOutput::Image { .. }) {
            caption(&services, &request, id, &token).await?;
        }
        produced.push(output);
    }
    drop(stream);

    if !produced.is_empty() {
        match serde_json::to_string(&produced) {
            Ok(json) => services.cache.set(&key, json).await,
            Err(e) => log::warn!("not caching {key}: {e}"),
        }
    }
    Ok(())
}

/// Write one result as a new card centered on `at`.
fn place(services: &Services, request: &GenerationRequest, output: &GenerationOutput, at: Point) -> CardId {
    let size = request.size;
    let draft = match output {
        GenerationOutput::Image { src } => CardDraft::image(src.clone(), size).with_prompt(request.prompt.clone()),
        GenerationOutput::Text { body } => CardDraft::text(body.clone(), size),
        GenerationOutput::Video { src } => CardDraft {
            size,
            image_prompt: Some(request.prompt.clone()),
            ..CardDraft::default()
        }
        .with_metadata("videoSrc", serde_json::Value::String(src.clone())),
    };
    services.store.add_card_centered(draft, at)
}

/// Title a freshly placed image card. Any failure falls back to the
/// configured title; only cancellation stops the task.
async fn caption(
    services: &Services,
    request: &GenerationRequest,
    card: CardId,
    token: &CancellationToken,
) -> TaskResult {
    let ask = GenerationRequest::new(
        GenerationKind::Text,
        format!("A short title for an image of: {}", request.prompt),
        services.config.text_card_size,
    );
    let mut stream = tracked_generate(
        services.generator.as_ref(),
        &services.progress,
        &services.connection,
        ask,
        token.clone(),
    );
    let first = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(TaskError::Cancelled),
        first = stream.next() => first,
    };
    let title = match first {
        Some(Ok(GenerationOutput::Text { body })) if !body.trim().is_empty() => body.trim().to_string(),
        Some(Err(e)) => {
            log::debug!("caption for {card} failed, using fallback: {e}");
            services.config.caption_fallback.clone()
        }
        _ => services.config.caption_fallback.clone(),
    };
    if !services.store.update_card(card, |item| item.title = Some(title)) {
        log::debug!("caption for {card} dropped, card is gone");
    }
    Ok(())
}
