//! Dynamically sized worker pool.
//!
//! All pool state (worker count, waiting queue, ready workers) belongs to a single dispatch
//! loop. Callers talk to it over a channel and workers report back by offering a one-shot
//! slot for their next task, so nothing outside the loop ever mutates the pool.

use futures::FutureExt;
use std::{
	any::Any,
	collections::VecDeque,
	future::Future,
	panic::AssertUnwindSafe,
	pin::Pin,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Mutex, PoisonError,
	},
	time::Duration,
};
use tokio::{
	sync::{mpsc, oneshot},
	task::JoinSet,
	time::Instant,
};
use tokio_util::sync::CancellationToken;

use super::error::PoolError;

/// Idle period after which one ready worker is closed
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Unit of work executed by a worker
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Slot a ready worker offers for its next task; dropping it closes the worker
type WorkerSlot = oneshot::Sender<Task>;

enum Message {
	Task(Task),
	Stop { drain: bool },
}

/// Bounded pool of workers fed by a single dispatch loop.
///
/// Must be created within a Tokio runtime.
pub struct WorkerPool {
	max_workers: usize,
	submissions: mpsc::UnboundedSender<Message>,
	stopped: Mutex<bool>,
	exited: CancellationToken,
	worker_count: Arc<AtomicUsize>,
}

impl WorkerPool {
	/// Creates a pool of at most `max_workers` workers (at least one).
	pub fn new(max_workers: usize) -> Self {
		Self::with_idle_timeout(max_workers, DEFAULT_IDLE_TIMEOUT)
	}

	pub fn with_idle_timeout(max_workers: usize, idle_timeout: Duration) -> Self {
		let max_workers = max_workers.max(1);
		let (submissions, receiver) = mpsc::unbounded_channel();
		let exited = CancellationToken::new();
		let worker_count = Arc::new(AtomicUsize::new(0));

		let dispatcher = Dispatcher {
			max_workers,
			idle_timeout,
			worker_count: worker_count.clone(),
			queue: VecDeque::new(),
			ready: VecDeque::new(),
			workers: JoinSet::new(),
			count: 0,
		};
		let done = exited.clone();
		tokio::spawn(async move {
			dispatcher.run(receiver).await;
			done.cancel();
		});

		Self {
			max_workers,
			submissions,
			stopped: Mutex::new(false),
			exited,
			worker_count,
		}
	}

	pub fn max_workers(&self) -> usize {
		self.max_workers
	}

	/// Number of live workers, busy or ready
	pub fn worker_count(&self) -> usize {
		self.worker_count.load(Ordering::SeqCst)
	}

	/// Queues `task` for execution without waiting for it.
	pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
		if *stopped {
			return Err(PoolError::Stopped);
		}
		self.submissions
			.send(Message::Task(Box::pin(task)))
			.map_err(|_| PoolError::Stopped)
	}

	/// Submits `task` and waits until it has run.
	///
	/// Fails with [`PoolError::Stopped`] if the pool was stopped before the task ran.
	pub async fn submit_and_wait<F>(&self, task: F) -> Result<(), PoolError>
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let (done_tx, done_rx) = oneshot::channel();
		self.submit(async move {
			run_task(Box::pin(task)).await;
			let _ = done_tx.send(());
		})?;
		done_rx.await.map_err(|_| PoolError::Stopped)
	}

	/// Stops the pool, abandoning queued tasks. Running tasks finish first.
	pub async fn stop(&self) {
		self.shutdown(false).await
	}

	/// Stops the pool after every queued task has run.
	pub async fn stop_wait(&self) {
		self.shutdown(true).await
	}

	pub fn stopped(&self) -> bool {
		*self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
	}

	async fn shutdown(&self, drain: bool) {
		{
			let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
			if !*stopped {
				*stopped = true;
				let _ = self.submissions.send(Message::Stop { drain });
			}
		}
		self.exited.cancelled().await;
	}
}

/// State owned by the dispatch loop.
struct Dispatcher {
	max_workers: usize,
	idle_timeout: Duration,
	worker_count: Arc<AtomicUsize>,
	queue: VecDeque<Task>,
	ready: VecDeque<WorkerSlot>,
	workers: JoinSet<()>,
	count: usize,
}

impl Dispatcher {
	async fn run(mut self, mut submissions: mpsc::UnboundedReceiver<Message>) {
		let (ready_tx, mut ready_rx) = mpsc::unbounded_channel::<WorkerSlot>();
		let idle = tokio::time::sleep(self.idle_timeout);
		tokio::pin!(idle);

		let drain = loop {
			self.hand_out_queue();

			tokio::select! {
				biased;
				Some(slot) = ready_rx.recv() => self.ready.push_back(slot),
				message = submissions.recv() => match message {
					Some(Message::Task(task)) => {
						idle.as_mut().reset(Instant::now() + self.idle_timeout);
						self.dispatch(task, &ready_tx);
					}
					Some(Message::Stop { drain }) => break drain,
					// Every handle is gone, nobody can stop the pool any more
					None => break true,
				},
				Some(_) = self.workers.join_next(), if !self.workers.is_empty() => {}
				_ = &mut idle => {
					self.reap_one();
					idle.as_mut().reset(Instant::now() + self.idle_timeout);
				}
			}
		};

		if drain {
			while !self.queue.is_empty() {
				self.hand_out_queue();
				if self.queue.is_empty() {
					break;
				}
				if self.count < self.max_workers {
					if let Some(task) = self.queue.pop_front() {
						self.spawn_worker(task, &ready_tx);
					}
					continue;
				}
				match ready_rx.recv().await {
					Some(slot) => self.ready.push_back(slot),
					None => break,
				}
			}
		} else if !self.queue.is_empty() {
			tracing::warn!("Worker pool stopped, abandoning {} queued tasks", self.queue.len());
			self.queue.clear();
		}

		// Idle workers exit when their slot drops, busy ones when they cannot report back
		self.ready.clear();
		drop(ready_rx);
		drop(ready_tx);
		while self.workers.join_next().await.is_some() {}
		self.count = 0;
		self.publish_count();
		tracing::debug!("Worker pool dispatch loop exited");
	}

	/// Gives a new task to a ready worker, a new worker, or the queue, in that order.
	fn dispatch(&mut self, task: Task, ready_tx: &mpsc::UnboundedSender<WorkerSlot>) {
		if !self.queue.is_empty() {
			self.queue.push_back(task);
			return;
		}
		let task = match self.hand_to_ready(task) {
			Ok(()) => return,
			Err(task) => task,
		};
		if self.count < self.max_workers {
			self.spawn_worker(task, ready_tx);
		} else {
			self.queue.push_back(task);
		}
	}

	/// Feeds queued tasks to ready workers, oldest first.
	fn hand_out_queue(&mut self) {
		while !self.ready.is_empty() {
			let Some(task) = self.queue.pop_front() else {
				return;
			};
			if let Err(task) = self.hand_to_ready(task) {
				self.queue.push_front(task);
				return;
			}
		}
	}

	fn hand_to_ready(&mut self, mut task: Task) -> Result<(), Task> {
		while let Some(slot) = self.ready.pop_front() {
			match slot.send(task) {
				Ok(()) => return Ok(()),
				Err(returned) => {
					// The worker is gone without us closing it
					task = returned;
					self.count = self.count.saturating_sub(1);
					self.publish_count();
				}
			}
		}
		Err(task)
	}

	fn spawn_worker(&mut self, task: Task, ready_tx: &mpsc::UnboundedSender<WorkerSlot>) {
		self.count += 1;
		self.publish_count();
		self.workers.spawn(worker(task, ready_tx.clone()));
	}

	fn reap_one(&mut self) {
		if self.ready.pop_back().is_some() {
			self.count = self.count.saturating_sub(1);
			self.publish_count();
			tracing::trace!("Closed idle worker, {} left", self.count);
		}
	}

	fn publish_count(&self) {
		self.worker_count.store(self.count, Ordering::SeqCst);
	}
}

async fn worker(first: Task, ready_tx: mpsc::UnboundedSender<WorkerSlot>) {
	let mut next = Some(first);
	while let Some(task) = next.take() {
		run_task(task).await;

		let (slot, assigned) = oneshot::channel();
		if ready_tx.send(slot).is_err() {
			return;
		}
		next = assigned.await.ok();
	}
}

/// Runs a task to completion, logging instead of propagating a panic.
async fn run_task(task: Task) {
	if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
		tracing::error!(panic = %panic_message(panic.as_ref()), "worker task panicked");
	}
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	if let Some(message) = panic.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = panic.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic payload".to_string()
	}
}
