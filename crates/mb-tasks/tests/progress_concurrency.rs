//! Progress counters under many concurrent calls.

use futures::StreamExt;
use mb_core::{Connection, Size};
use mb_tasks::{
    CancellationToken, EchoGenerator, GenerationKind, GenerationRequest, Progress,
    ProgressCounters, Task, TaskError, TaskQueue, TaskStatus, tracked_generate,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const KINDS: [GenerationKind; 3] = [
    GenerationKind::Image,
    GenerationKind::Text,
    GenerationKind::Video,
];

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_return_counters_to_start() {
    let progress = Progress::default();
    let peak = Arc::new(AtomicU32::new(0));
    let seen = peak.clone();
    let _sub = progress.subscribe(move |c| {
        seen.fetch_max(c.total(), Ordering::SeqCst);
    });

    let gate = CancellationToken::new();
    let mut handles = Vec::new();
    for i in 0..30 {
        let progress = progress.clone();
        let gate = gate.clone();
        handles.push(tokio::spawn(async move {
            let _guard = progress.track(KINDS[i % 3]);
            gate.cancelled().await;
        }));
    }

    while progress.snapshot().total() < 30 {
        tokio::task::yield_now().await;
    }
    assert_eq!(
        progress.snapshot(),
        ProgressCounters {
            image_gen: 10,
            text_gen: 10,
            video_gen: 10,
        }
    );

    gate.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(progress.snapshot(), ProgressCounters::default());
    assert_eq!(peak.load(Ordering::SeqCst), 30);
}

#[tokio::test]
async fn aborted_tasks_still_release_their_count() {
    let progress = Progress::default();
    let mut handles = Vec::new();
    for _ in 0..5 {
        let progress = progress.clone();
        handles.push(tokio::spawn(async move {
            let _guard = progress.track(GenerationKind::Image);
            std::future::pending::<()>().await;
        }));
    }
    while progress.snapshot().image_gen < 5 {
        tokio::task::yield_now().await;
    }
    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        assert!(handle.await.unwrap_err().is_cancelled());
    }
    assert_eq!(progress.snapshot().image_gen, 0);
}

#[tokio::test]
async fn queued_generations_cancelled_together() {
    let progress = Progress::default();
    let queue = TaskQueue::new();
    let generator = Arc::new(EchoGenerator {
        count: 1000,
        delay: Duration::from_millis(5),
    });
    let received = Arc::new(Mutex::new(Vec::new()));

    let mut ids = Vec::new();
    for (i, kind) in KINDS.into_iter().enumerate() {
        let progress = progress.clone();
        let generator = generator.clone();
        let received = received.clone();
        ids.push(queue.submit(Task::new(format!("gen-{i}"), move |token: CancellationToken| async move {
            let request = GenerationRequest::new(kind, "loop", Size::new(10.0, 10.0));
            let mut stream = tracked_generate(
                generator.as_ref(),
                &progress,
                &Connection::new("echo", "k"),
                request,
                token.clone(),
            );
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(TaskError::Cancelled),
                    next = stream.next() => match next {
                        Some(item) => {
                            let output = item?;
                            received.lock().unwrap().push(output);
                        }
                        None => return Ok(()),
                    },
                }
            }
        })));
    }

    while progress.snapshot().total() < 3 {
        tokio::task::yield_now().await;
    }
    queue.cancel_all();
    queue.wait_idle().await;

    for id in ids {
        assert_eq!(queue.status(id), Some(TaskStatus::Cancelled));
    }
    assert_eq!(progress.snapshot(), ProgressCounters::default());
    assert_eq!(progress.status_text(), "Idle");

    let after = received.lock().unwrap().len();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(received.lock().unwrap().len(), after);
}
