//! A speech backend that paces text in real time without producing audio.
//!
//! [`PacedBackend`] splits each request with
//! [`split_for_synthesis`](crate::speech::split_for_synthesis), "speaks" every
//! piece for `chars × ms_per_char / rate` milliseconds on a tokio task, and
//! reports progress and completion exactly like an audio engine would. The
//! terminal reader uses it to print each utterance as it is spoken, and the
//! async tests use it with a paused clock.
//!
//! Requests queue behind each other unless `cancel_previous` is set, in which
//! case everything queued or speaking is aborted and reported as
//! [`SpeechError::Cancelled`].

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};

use crate::config::SpeechConfig;
use crate::speech::backend::{
    BackendEvent, BackendEventKind, BackendEventSender, SpeakRequest, SpeechBackend, SpeechError,
    SpeechTicket,
};
use crate::speech::split::split_for_synthesis;

/// Granularity of progress reports and pause checks.
const PROGRESS_STEP_MS: f64 = 100.0;

/// One piece of text the backend started speaking.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub ticket: SpeechTicket,
    pub text: String,
}

#[derive(Default)]
struct Queue {
    /// Last spawned request; the next continuation waits for it.
    tail: Option<JoinHandle<()>>,
    running: Vec<(SpeechTicket, AbortHandle)>,
}

// ---------------------------------------------------------------------------
// PacedBackend
// ---------------------------------------------------------------------------

/// Real-time paced backend. Must be used from inside a tokio runtime.
pub struct PacedBackend {
    events: BackendEventSender,
    config: SpeechConfig,
    queue: Mutex<Queue>,
    paused: watch::Sender<bool>,
    narration: Option<mpsc::UnboundedSender<Utterance>>,
}

impl PacedBackend {
    /// Create a backend that reports on `events`.
    pub fn new(events: BackendEventSender, config: SpeechConfig) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            events,
            config,
            queue: Mutex::new(Queue::default()),
            paused,
            narration: None,
        }
    }

    /// Also publish every utterance as it starts.
    pub fn with_narration(mut self, narration: mpsc::UnboundedSender<Utterance>) -> Self {
        self.narration = Some(narration);
        self
    }

    fn cancel_all(&self, queue: &mut Queue) {
        for (ticket, abort) in queue.running.drain(..) {
            if abort.is_finished() {
                continue;
            }
            abort.abort();
            log::debug!("speech: cancelled request {ticket:?}");
            let _ = self.events.send(BackendEvent {
                ticket,
                kind: BackendEventKind::Failed(SpeechError::Cancelled),
            });
        }
        queue.tail = None;
        self.paused.send_replace(false);
    }
}

impl SpeechBackend for PacedBackend {
    fn speak(&self, request: SpeakRequest) -> Result<(), SpeechError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SpeechError::Unavailable(e.to_string()))?;

        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if request.cancel_previous {
            self.cancel_all(&mut queue);
        }
        queue.running.retain(|(_, abort)| !abort.is_finished());

        let units = split_for_synthesis(&request.text, self.config.max_chars_per_utterance);
        log::trace!(
            "speech: {:?} voice={} volume={} units={}",
            request.ticket,
            request.voice_id,
            request.volume,
            units.len()
        );

        let narration = Narration {
            ticket: request.ticket,
            units,
            rate: request.rate,
            ms_per_char: self.config.ms_per_char,
            events: self.events.clone(),
            paused: self.paused.subscribe(),
            narration: self.narration.clone(),
        };

        let previous = queue.tail.take();
        let handle = runtime.spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            narration.run().await;
        });

        queue.running.push((request.ticket, handle.abort_handle()));
        queue.tail = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        self.cancel_all(&mut queue);
    }

    fn pause(&self) {
        self.paused.send_replace(true);
    }

    fn resume(&self) {
        self.paused.send_replace(false);
    }
}

// ---------------------------------------------------------------------------
// Narration task
// ---------------------------------------------------------------------------

struct Narration {
    ticket: SpeechTicket,
    units: Vec<String>,
    rate: f32,
    ms_per_char: u64,
    events: BackendEventSender,
    paused: watch::Receiver<bool>,
    narration: Option<mpsc::UnboundedSender<Utterance>>,
}

impl Narration {
    async fn run(mut self) {
        let total: usize = self.units.iter().map(|u| u.chars().count()).sum();
        let total = total.max(1) as f64;
        let mut spoken = 0usize;

        for unit in std::mem::take(&mut self.units) {
            let len = unit.chars().count();
            if let Some(tx) = &self.narration {
                let _ = tx.send(Utterance {
                    ticket: self.ticket,
                    text: unit,
                });
            }

            let unit_ms = (len as f64 * self.ms_per_char as f64 / self.rate as f64).max(1.0);
            let steps = (unit_ms / PROGRESS_STEP_MS).ceil().max(1.0) as usize;
            let step = Duration::from_secs_f64(unit_ms / steps as f64 / 1000.0);

            for i in 1..=steps {
                self.wait_while_paused().await;
                tokio::time::sleep(step).await;
                // A pause that landed mid-step holds this step's report too.
                self.wait_while_paused().await;

                let done = spoken as f64 + len as f64 * i as f64 / steps as f64;
                if done < total {
                    let _ = self.events.send(BackendEvent {
                        ticket: self.ticket,
                        kind: BackendEventKind::Progress((done / total * 100.0) as f32),
                    });
                }
            }
            spoken += len;
        }

        self.wait_while_paused().await;
        let _ = self.events.send(BackendEvent {
            ticket: self.ticket,
            kind: BackendEventKind::Finished,
        });
    }

    async fn wait_while_paused(&mut self) {
        loop {
            let paused = *self.paused.borrow_and_update();
            if !paused || self.paused.changed().await.is_err() {
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
