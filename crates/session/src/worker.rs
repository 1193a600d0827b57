use std::time::Duration;

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::browser::Event;

/// A running auto-refresh worker for one board. Dropping the handle stops
/// the worker.
#[derive(Debug)]
pub struct RefreshHandle {
    board: String,
    kill: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn board(&self) -> &str {
        &self.board
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(mut self) {
        self.kill();
    }

    fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
            info!("Stopping refresh worker for /{}/", self.board);
        }
        self.task.abort();
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Sends [`Event::RefreshDue`] for `board` every `interval`, first one
/// interval from now, until killed or until the receiver is gone.
pub fn start(board: &str, every: Duration, events_tx: mpsc::Sender<Event>) -> RefreshHandle {
    info!("Starting refresh worker for /{}/ every {:?}", board, every);
    let (kill_tx, mut kill_rx) = oneshot::channel();
    let name = board.to_string();
    let task = tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + every, every);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = &mut kill_rx => break,
                _ = ticks.tick() => {
                    debug!("Refresh due for /{}/", name);
                    let event = Event::RefreshDue { board: name.clone() };
                    if events_tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Refresh worker for /{}/ exited", name);
    });
    RefreshHandle {
        board: board.to_string(),
        kill: Some(kill_tx),
        task,
    }
}
