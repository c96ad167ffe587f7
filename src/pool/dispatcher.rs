//! The dispatcher thread: admission, scaling and shutdown
//!
//! The dispatcher is the only writer of the worker count, the worker id
//! counter, the pause flag and the priority lane. Callers reach it through
//! rendezvous channels; workers reach it through retirement notices.

use crate::core::priority::{PriorityLane, StagedTask};
use crate::core::task::{QueuedTask, WorkItem};
use crate::core::{PoolError, Result};
use crate::pool::config::PoolConfig;
use crate::pool::shared::PoolShared;
use crate::pool::stats::PoolState;
use crate::pool::worker::Worker;
use crossbeam_channel::{self as channel, Receiver, Select, SendError, Sender, TryRecvError};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Control requests sent by the façade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Pause,
    Resume,
    /// New ceiling, already clamped to at least 1
    Resize(usize),
}

/// A control request and its acknowledgement, which disconnects once the
/// request has been applied
pub(crate) struct ControlRequest {
    pub(crate) control: Control,
    ack: Sender<()>,
}

impl ControlRequest {
    pub(crate) fn new(control: Control) -> (Self, Receiver<()>) {
        let (ack, applied) = channel::bounded(0);
        (Self { control, ack }, applied)
    }
}

/// Dispatcher ends of the façade channels
pub(crate) struct DispatcherChannels {
    pub(crate) submissions: Receiver<QueuedTask>,
    pub(crate) control: Receiver<ControlRequest>,
    /// Disconnects when stop is requested
    pub(crate) stop: Receiver<()>,
    /// Dropped when the dispatcher exits, releasing every `stop` caller
    pub(crate) finalize: Sender<()>,
}

enum Event {
    Stop,
    Control(ControlRequest),
    Submitted(QueuedTask),
    HandedOff,
    Retired(usize),
    Tick,
}

pub(crate) struct Dispatcher {
    shared: Arc<PoolShared>,
    channels: DispatcherChannels,
    worker_tx: Sender<WorkItem>,
    worker_rx: Receiver<WorkItem>,
    retired_tx: Sender<usize>,
    retired_rx: Receiver<usize>,
    workers: HashMap<usize, Worker>,
    lane: PriorityLane,
    max_workers: usize,
    min_workers: usize,
    current_workers: usize,
    next_worker_id: usize,
    paused: bool,
    /// Set after a failed spawn; cleared on the next idle tick or resize
    spawn_blocked: bool,
    idle_check_interval: Duration,
    thread_name_prefix: String,
}

impl Dispatcher {
    /// Start the dispatcher thread
    pub(crate) fn start(
        config: &PoolConfig,
        shared: Arc<PoolShared>,
        channels: DispatcherChannels,
    ) -> Result<thread::JoinHandle<()>> {
        let (worker_tx, worker_rx) = channel::bounded(0);
        let (retired_tx, retired_rx) = channel::unbounded();

        let dispatcher = Self {
            shared,
            channels,
            worker_tx,
            worker_rx,
            retired_tx,
            retired_rx,
            workers: HashMap::new(),
            lane: PriorityLane::new(),
            max_workers: config.max_workers,
            min_workers: config.min_workers,
            current_workers: 0,
            next_worker_id: 1,
            paused: false,
            spawn_blocked: false,
            idle_check_interval: config.idle_check_interval,
            thread_name_prefix: config.thread_name_prefix.clone(),
        };

        thread::Builder::new()
            .name(format!("{}-dispatcher", config.thread_name_prefix))
            .spawn(move || dispatcher.run())
            .map_err(|e| PoolError::spawn_with_source(0, "cannot create dispatcher thread", e))
    }

    fn run(mut self) {
        log::info!(
            "worker pool '{}' running (max {} workers, idle check every {:?})",
            self.thread_name_prefix,
            self.max_workers,
            self.idle_check_interval
        );
        let ticker = channel::tick(self.idle_check_interval);

        loop {
            self.reap_retired();
            self.pump();
            if self.stop_requested() {
                break;
            }

            // Backpressure: while running with a backlog, admission waits
            // until the lane has been handed out
            let accepting = self.paused || self.lane.is_empty();
            let mut staged = if self.paused { None } else { self.lane.pop() };

            let event = self.next_event(&ticker, accepting, &mut staged);
            if let Some(staged) = staged {
                self.lane.restore(staged);
            }

            match event {
                Event::Stop => break,
                Event::Control(request) => {
                    self.apply(request.control);
                    drop(request.ack);
                }
                Event::Submitted(task) => {
                    self.shared.counters.record_submission();
                    #[cfg(feature = "tracing")]
                    crate::tracing::metrics::record_submission(task.priority.value(), self.lane.len());
                    self.lane.push(task);
                }
                Event::HandedOff => {}
                Event::Retired(id) => self.reap(id),
                Event::Tick => {
                    self.spawn_blocked = false;
                    self.scale_down_idle();
                }
            }
        }

        self.shutdown();
    }

    /// Block until one event is ready. A staged task is consumed only when
    /// the hand-off wins.
    fn next_event(
        &self,
        ticker: &Receiver<Instant>,
        accepting: bool,
        staged: &mut Option<StagedTask>,
    ) -> Event {
        let mut sel = Select::new();
        let stop = sel.recv(&self.channels.stop);
        let control = sel.recv(&self.channels.control);
        let retired = sel.recv(&self.retired_rx);
        let tick = sel.recv(ticker);
        let submit = accepting.then(|| sel.recv(&self.channels.submissions));
        let handoff = staged.is_some().then(|| sel.send(&self.worker_tx));

        let oper = sel.select();
        let index = oper.index();

        if index == stop {
            let _ = oper.recv(&self.channels.stop);
            Event::Stop
        } else if index == control {
            match oper.recv(&self.channels.control) {
                Ok(request) => Event::Control(request),
                Err(_) => Event::Stop,
            }
        } else if index == retired {
            match oper.recv(&self.retired_rx) {
                Ok(id) => Event::Retired(id),
                Err(_) => Event::Tick,
            }
        } else if index == tick {
            let _ = oper.recv(ticker);
            Event::Tick
        } else if Some(index) == submit {
            match oper.recv(&self.channels.submissions) {
                Ok(task) => Event::Submitted(task),
                Err(_) => Event::Stop,
            }
        } else {
            debug_assert_eq!(Some(index), handoff);
            match staged.take() {
                Some(task) => {
                    let item = WorkItem::Run(task.into_task());
                    // The dispatcher holds a receiver, so the queue never disconnects
                    let _ = oper.send(&self.worker_tx, item);
                    Event::HandedOff
                }
                None => Event::Tick,
            }
        }
    }

    fn stop_requested(&self) -> bool {
        matches!(
            self.channels.stop.try_recv(),
            Err(TryRecvError::Disconnected)
        )
    }

    fn apply(&mut self, control: Control) {
        match control {
            Control::Pause => {
                if !self.paused {
                    log::info!("worker pool '{}' paused", self.thread_name_prefix);
                }
                self.paused = true;
                self.shared.counters.set_state(PoolState::Paused);
            }
            Control::Resume => {
                if self.paused {
                    log::info!(
                        "worker pool '{}' resumed with {} queued tasks",
                        self.thread_name_prefix,
                        self.lane.len()
                    );
                }
                self.paused = false;
                self.shared.counters.set_state(PoolState::Running);
            }
            Control::Resize(max_workers) => {
                log::info!(
                    "worker pool '{}' resized: max workers {} -> {}",
                    self.thread_name_prefix,
                    self.max_workers,
                    max_workers
                );
                self.max_workers = max_workers;
                self.spawn_blocked = false;
                self.shared.counters.set_max_workers(max_workers);
            }
        }
    }

    /// Bind lane tasks to new workers while there is room below the ceiling
    fn pump(&mut self) {
        while !self.paused && !self.spawn_blocked && self.current_workers < self.max_workers {
            let Some(staged) = self.lane.pop() else {
                break;
            };
            if let Err(task) = self.spawn_worker(staged.into_task()) {
                self.lane.push(task);
            }
        }
    }

    /// Spawn a worker bound to `task`, handing the task back on failure
    fn spawn_worker(&mut self, task: QueuedTask) -> std::result::Result<(), QueuedTask> {
        let id = self.next_worker_id;
        self.next_worker_id += 1;

        match Worker::spawn(
            id,
            task,
            self.worker_rx.clone(),
            self.retired_tx.clone(),
            Arc::clone(&self.shared),
            &self.thread_name_prefix,
        ) {
            Ok(worker) => {
                self.workers.insert(id, worker);
                self.current_workers += 1;
                self.shared.counters.record_spawn();
                self.shared.counters.set_current_workers(self.current_workers);
                log::debug!(
                    "spawned worker {} ({}/{})",
                    id,
                    self.current_workers,
                    self.max_workers
                );
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_worker_start(id, self.current_workers);

                self.shared
                    .run_hook("on_worker_start", |hooks| hooks.on_worker_start(id));
                Ok(())
            }
            Err(failure) => {
                log::error!("{}", failure.error);
                self.spawn_blocked = true;
                match failure.task {
                    Some(task) => Err(task),
                    // The thread started and took the task after all
                    None => Ok(()),
                }
            }
        }
    }

    fn reap(&mut self, id: usize) {
        if let Some(worker) = self.workers.remove(&id) {
            worker.join();
        }
    }

    fn reap_retired(&mut self) {
        while let Ok(id) = self.retired_rx.try_recv() {
            self.reap(id);
        }
    }

    /// Retire workers idle for a full interval, never going below the floor
    ///
    /// The channel picks which parked worker takes each sentinel, so the
    /// retired worker is not necessarily the youngest or the oldest.
    fn scale_down_idle(&mut self) {
        if self.current_workers <= self.min_workers {
            return;
        }

        let now = Instant::now();
        let idle = self
            .workers
            .values()
            .filter(|worker| {
                worker
                    .activity()
                    .idle_for(now)
                    .is_some_and(|idle| idle >= self.idle_check_interval)
            })
            .count();
        let excess = (self.current_workers - self.min_workers).min(idle);

        let mut retired = 0;
        for _ in 0..excess {
            // Only a worker parked on the queue can take the sentinel
            if self.worker_tx.try_send(WorkItem::Retire).is_err() {
                break;
            }
            retired += 1;
        }

        if retired > 0 {
            self.current_workers -= retired;
            self.shared.counters.set_current_workers(self.current_workers);
            log::debug!(
                "retired {} idle workers, {} remaining",
                retired,
                self.current_workers
            );
            #[cfg(feature = "tracing")]
            crate::tracing::metrics::record_scale_down(retired, self.current_workers);
        }
    }

    /// Hand every parked task to the existing workers, ignoring pause
    fn drain_lane(&mut self) {
        while let Some(staged) = self.lane.pop() {
            let mut task = staged.into_task();
            if self.current_workers == 0 {
                match self.spawn_worker(task) {
                    Ok(()) => continue,
                    Err(returned) => task = returned,
                }
            }

            if self.current_workers == 0 {
                log::error!("no worker available to run task {}, discarding it", task.id);
                self.discard(task);
                continue;
            }
            if let Err(SendError(WorkItem::Run(task))) =
                self.worker_tx.send(WorkItem::Run(task))
            {
                self.discard(task);
            }
        }
    }

    fn discard(&self, task: QueuedTask) {
        log::debug!("discarding task {}", task.id);
        drop(task);
        self.shared.counters.record_discarded();
        self.shared.pending.done();
    }

    fn shutdown(mut self) {
        let graceful = self.shared.graceful();
        self.shared.counters.set_state(PoolState::Draining);
        log::info!(
            "worker pool '{}' draining ({}, {} queued tasks, {} workers)",
            self.thread_name_prefix,
            if graceful { "graceful" } else { "forceful" },
            self.lane.len(),
            self.current_workers
        );

        if graceful {
            self.drain_lane();
        } else {
            let queued: Vec<QueuedTask> = self.lane.drain().collect();
            for task in queued {
                self.discard(task);
            }
        }

        // Each live worker takes exactly one sentinel and then stops receiving
        for _ in 0..self.current_workers {
            let _ = self.worker_tx.send(WorkItem::Retire);
        }
        self.current_workers = 0;
        self.shared.counters.set_current_workers(0);

        for (_, worker) in self.workers.drain() {
            log::debug!("joining worker {}", worker.id());
            worker.join();
        }
        while self.retired_rx.try_recv().is_ok() {}

        self.shared.counters.set_state(PoolState::Stopped);
        log::info!("worker pool '{}' stopped", self.thread_name_prefix);
        #[cfg(feature = "tracing")]
        {
            let stats = self.shared.counters.snapshot(self.shared.pending.len());
            crate::tracing::metrics::record_pool_stop(graceful, stats.tasks_completed, stats.tasks_discarded);
        }

        self.shared
            .run_hook("on_pool_stop", |hooks| hooks.on_pool_stop(graceful));
        drop(self.channels.finalize);
    }
}
