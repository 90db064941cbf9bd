//! Live progress of in-flight generation calls.
//!
//! One counter per category. A call takes a [`ProgressGuard`] before it
//! starts; the guard gives the count back when dropped, whichever way the
//! call ends (result, error, cancellation, or the consumer just letting go).

use mb_core::ObservableCell;
use mb_core::cell::Subscription;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What a generation call produces. Also selects its progress counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Image,
    Text,
    Video,
}

impl GenerationKind {
    /// Verb shown in the status line.
    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "Writing",
            Self::Image => "Rendering",
            Self::Video => "Directing",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::Video => "video",
        })
    }
}

/// Number of in-flight calls per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCounters {
    pub image_gen: u32,
    pub text_gen: u32,
    pub video_gen: u32,
}

impl ProgressCounters {
    pub fn get(&self, kind: GenerationKind) -> u32 {
        match kind {
            GenerationKind::Image => self.image_gen,
            GenerationKind::Text => self.text_gen,
            GenerationKind::Video => self.video_gen,
        }
    }

    fn slot(&mut self, kind: GenerationKind) -> &mut u32 {
        match kind {
            GenerationKind::Image => &mut self.image_gen,
            GenerationKind::Text => &mut self.text_gen,
            GenerationKind::Video => &mut self.video_gen,
        }
    }

    pub fn total(&self) -> u32 {
        self.image_gen + self.text_gen + self.video_gen
    }

    pub fn has_active_work(&self) -> bool {
        self.total() > 0
    }

    /// "Writing 1 · Rendering 3", or "Idle".
    pub fn status_text(&self, separator: &str) -> String {
        let parts: Vec<String> = [
            GenerationKind::Text,
            GenerationKind::Image,
            GenerationKind::Video,
        ]
        .into_iter()
        .filter(|&kind| self.get(kind) > 0)
        .map(|kind| format!("{} {}", kind.label(), self.get(kind)))
        .collect();
        if parts.is_empty() {
            "Idle".to_string()
        } else {
            parts.join(separator)
        }
    }
}

/// Shared progress aggregator. Cloning shares the same counters.
#[derive(Clone)]
pub struct Progress {
    counters: ObservableCell<ProgressCounters>,
    separator: Arc<str>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(" · ")
    }
}

impl Progress {
    pub fn new(separator: &str) -> Self {
        Self {
            counters: ObservableCell::default(),
            separator: Arc::from(separator),
        }
    }

    /// Count one call of `kind` as in flight until the guard is dropped.
    #[must_use = "the call is only counted while the guard is alive"]
    pub fn track(&self, kind: GenerationKind) -> ProgressGuard {
        self.counters.update(|c| {
            let mut next = *c;
            *next.slot(kind) += 1;
            next
        });
        log::trace!("progress +1 {kind}");
        ProgressGuard {
            progress: self.clone(),
            kind,
        }
    }

    pub fn snapshot(&self) -> ProgressCounters {
        *self.counters.get()
    }

    pub fn status_text(&self) -> String {
        self.snapshot().status_text(&self.separator)
    }

    pub fn has_active_work(&self) -> bool {
        self.snapshot().has_active_work()
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(
        &self,
        callback: impl Fn(&ProgressCounters) + Send + Sync + 'static,
    ) -> Subscription {
        self.counters.subscribe(callback)
    }

    fn release(&self, kind: GenerationKind) {
        self.counters.update(|c| {
            let mut next = *c;
            let slot = next.slot(kind);
            if *slot == 0 {
                log::error!("progress counter for {kind} released below zero");
            }
            *slot = slot.saturating_sub(1);
            next
        });
        log::trace!("progress -1 {kind}");
    }
}

/// Holds one unit of a progress counter. Decrements exactly once, on drop.
pub struct ProgressGuard {
    progress: Progress,
    kind: GenerationKind,
}

impl ProgressGuard {
    pub fn kind(&self) -> GenerationKind {
        self.kind
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.progress.release(self.kind);
    }
}

impl fmt::Debug for ProgressGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressGuard").field("kind", &self.kind).finish()
    }
}
