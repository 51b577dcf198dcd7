//! Cooperative, frame-budgeted chunk generation queue.
//!
//! The queue owns a flat task list and drives one task per frame through the
//! step pipeline `Grid -> Neighbors -> Index -> resolve`. Grid and Index
//! work in fixed-size batches and yield back to the frame loop whenever the
//! configured wall-time budget is exhausted, so the render loop never
//! blocks on chunk construction. Completion is delivered through oneshot
//! channels: `enqueue` hands back a ticket the caller may poll or drop.
//!
//! There is no per-task cancellation; `clear` rejects every non-terminal
//! task and is the only cancellation primitive.

use crate::chunk::{Chunk, StepProgress, INDEX_BATCH};
use crate::diag::Clock;
use crate::hex::AxialHex;
use crate::world::WorldMap;
use bevy::prelude::*;
use futures::channel::oneshot;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Surfaced to every waiter when the queue is cleared.
    #[error("generation queue cleared")]
    QueueCleared,
    /// Internal invariant violation: the placeholder chunk disappeared.
    #[error("placeholder chunk missing for {0}")]
    PlaceholderMissing(AxialHex),
}

/// Completion ticket for an enqueued chunk. Resolves with the chunk center;
/// the chunk itself is read from the [`WorldMap`] the caller already owns.
pub type ChunkTicket = oneshot::Receiver<Result<AxialHex, QueueError>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

/// Construction phases, strictly ordered per task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GenStep {
    Grid,
    Neighbors,
    Index,
}

struct GenerationTask {
    center: AxialHex,
    priority: i32,
    status: TaskStatus,
    step: GenStep,
    cursor: usize,
    resolvers: Vec<oneshot::Sender<Result<AxialHex, QueueError>>>,
}

impl GenerationTask {
    fn new(center: AxialHex, priority: i32) -> Self {
        GenerationTask {
            center,
            priority,
            status: TaskStatus::Pending,
            step: GenStep::Grid,
            cursor: 0,
            resolvers: Vec::new(),
        }
    }

    fn attach(&mut self) -> ChunkTicket {
        let (tx, rx) = oneshot::channel();
        self.resolvers.push(tx);
        rx
    }

    fn resolve(&mut self, result: Result<AxialHex, QueueError>) {
        for tx in self.resolvers.drain(..) {
            // A dropped ticket is fine; nobody is waiting on that one.
            let _ = tx.send(result.clone());
        }
    }
}

/// Outcome of a single `process_one_frame` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No tasks remain.
    Idle,
    /// Work remains for future frames.
    MorePending,
}

#[derive(Resource)]
pub struct GenerationQueue {
    tasks: Vec<GenerationTask>,
    budget: Duration,
    radius: u32,
    hex_size: f64,
    clock: Box<dyn Clock + Send + Sync>,
    completed: Vec<AxialHex>,
}

impl GenerationQueue {
    /// # Arguments
    /// * `radius` - world-wide chunk ring radius
    /// * `hex_size` - world-wide hex size, used for placeholder positions
    /// * `budget_ms` - cooperative wall-time budget per frame
    /// * `clock` - injected time source (manual in tests)
    #[must_use]
    pub fn new(
        radius: u32,
        hex_size: f64,
        budget_ms: f64,
        clock: Box<dyn Clock + Send + Sync>,
    ) -> Self {
        GenerationQueue {
            tasks: Vec::new(),
            budget: Duration::from_secs_f64(budget_ms / 1000.0),
            radius,
            hex_size,
            clock,
            completed: Vec::new(),
        }
    }

    pub fn set_budget_ms(&mut self, budget_ms: f64) {
        self.budget = Duration::from_secs_f64(budget_ms.max(0.0) / 1000.0);
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_queued(&self, center: AxialHex) -> bool {
        self.tasks.iter().any(|t| t.center == center)
    }

    /// Request construction of the chunk at `center`.
    ///
    /// * An existing task has its priority raised to the maximum of old and
    ///   new, and the returned ticket resolves together with it.
    /// * An already-initialized chunk yields a ticket that is ready
    ///   immediately; no task is created.
    /// * A present-but-uninitialized chunk (someone else's placeholder) gets
    ///   a fresh task attached to it.
    /// * Otherwise a placeholder is inserted into the world map right away,
    ///   so concurrent proximity checks observe the chunk, and a task is
    ///   attached.
    pub fn enqueue(
        &mut self,
        center: AxialHex,
        priority: i32,
        world: &mut WorldMap,
    ) -> ChunkTicket {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.center == center) {
            task.priority = task.priority.max(priority);
            return task.attach();
        }

        match world.get(center) {
            Some(chunk) if chunk.initialized => {
                let (tx, rx) = oneshot::channel();
                let _ = tx.send(Ok(center));
                rx
            }
            Some(_) => {
                let mut task = GenerationTask::new(center, priority);
                let ticket = task.attach();
                self.tasks.push(task);
                ticket
            }
            None => {
                world.add_placeholder(Chunk::placeholder(center, self.hex_size));
                let mut task = GenerationTask::new(center, priority);
                let ticket = task.attach();
                self.tasks.push(task);
                ticket
            }
        }
    }

    /// Drive the highest-priority task for at most one frame budget.
    ///
    /// Selection prefers higher priority; at equal priority a `Pending` task
    /// beats a `Generating` one. Step functions run repeatedly until the
    /// task completes or the budget elapses, in which case the step cursor
    /// is saved and control returns to the frame loop.
    pub fn process_one_frame(&mut self, world: &mut WorldMap) -> FrameOutcome {
        if self.tasks.is_empty() {
            return FrameOutcome::Idle;
        }

        let idx = self
            .tasks
            .iter()
            .enumerate()
            .max_by_key(|(_, t)| (t.priority, t.status == TaskStatus::Pending))
            .map(|(i, _)| i)
            .expect("task list is non-empty");

        if self.tasks[idx].status == TaskStatus::Pending {
            self.tasks[idx].status = TaskStatus::Generating;
            if !world.contains(self.tasks[idx].center) {
                let center = self.tasks[idx].center;
                error!("generation task for {center} lost its placeholder chunk");
                self.fail_task(idx, QueueError::PlaceholderMissing(center));
                return self.remaining_outcome();
            }
        }

        let started = self.clock.now();
        loop {
            match self.drive_step(idx, world) {
                Err(err) => {
                    self.fail_task(idx, err);
                    return self.remaining_outcome();
                }
                Ok(true) => {
                    let mut task = self.tasks.swap_remove(idx);
                    task.status = TaskStatus::Completed;
                    task.resolve(Ok(task.center));
                    self.completed.push(task.center);
                    return self.remaining_outcome();
                }
                Ok(false) => {
                    if self.clock.now().saturating_sub(started) > self.budget {
                        return FrameOutcome::MorePending;
                    }
                }
            }
        }
    }

    /// Centers whose tasks completed since the last call. Drained.
    pub fn take_completed(&mut self) -> Vec<AxialHex> {
        std::mem::take(&mut self.completed)
    }

    /// Reject every non-terminal task with [`QueueError::QueueCleared`].
    pub fn clear(&mut self) {
        for mut task in self.tasks.drain(..) {
            task.status = TaskStatus::Failed;
            task.resolve(Err(QueueError::QueueCleared));
        }
    }

    fn remaining_outcome(&self) -> FrameOutcome {
        if self.tasks.is_empty() {
            FrameOutcome::Idle
        } else {
            FrameOutcome::MorePending
        }
    }

    fn fail_task(&mut self, idx: usize, err: QueueError) {
        let mut task = self.tasks.swap_remove(idx);
        task.status = TaskStatus::Failed;
        warn!("generation task for {} failed: {err}", task.center);
        task.resolve(Err(err));
    }

    /// Run one batch of the current step. Returns `Ok(true)` when the whole
    /// pipeline for this task is done.
    fn drive_step(&mut self, idx: usize, world: &mut WorldMap) -> Result<bool, QueueError> {
        let center = self.tasks[idx].center;
        let radius = self.radius;
        let (step, cursor) = {
            let task = &self.tasks[idx];
            (task.step, task.cursor)
        };

        match step {
            GenStep::Grid => {
                let chunk = world
                    .get_mut(center)
                    .ok_or(QueueError::PlaceholderMissing(center))?;
                match chunk.grid_step(radius, cursor) {
                    StepProgress::More(next) => self.tasks[idx].cursor = next,
                    StepProgress::Done => {
                        self.tasks[idx].step = GenStep::Neighbors;
                        self.tasks[idx].cursor = 0;
                    }
                }
                Ok(false)
            }
            GenStep::Neighbors => {
                let chunk = world
                    .get_mut(center)
                    .ok_or(QueueError::PlaceholderMissing(center))?;
                chunk.neighbors_step(radius);
                self.tasks[idx].step = GenStep::Index;
                self.tasks[idx].cursor = 0;
                Ok(false)
            }
            GenStep::Index => {
                let total = world
                    .get(center)
                    .ok_or(QueueError::PlaceholderMissing(center))?
                    .tile_count();
                let end = (cursor + INDEX_BATCH).min(total);
                let batch: Vec<AxialHex> = world
                    .get(center)
                    .ok_or(QueueError::PlaceholderMissing(center))?
                    .tiles[cursor..end]
                    .iter()
                    .map(|t| t.hex)
                    .collect();
                for hex in batch {
                    world.publish_tile(hex, center);
                }
                if end == total {
                    let chunk = world
                        .get_mut(center)
                        .ok_or(QueueError::PlaceholderMissing(center))?;
                    chunk.initialized = true;
                    Ok(true)
                } else {
                    self.tasks[idx].cursor = end;
                    Ok(false)
                }
            }
        }
    }
}

/// Per-frame queue system: drive at most one task for one budget window.
#[allow(clippy::needless_pass_by_value)]
pub fn process_generation_queue(
    mut queue: ResMut<GenerationQueue>,
    mut world: ResMut<WorldMap>,
) {
    queue.process_one_frame(&mut world);
}
