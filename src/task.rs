//! Tick-driven tasks with single-slot ownership
//!
//! A task is a state machine advanced once per tick by its owner. Each
//! [`TaskSlot`] holds at most one task; spawning into an occupied slot drops
//! the previous task first. Cancelling drops the task synchronously, so a
//! cancelled task can never write again.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Finished,
}

pub trait TickTask<Ctx: ?Sized> {
    /// Advances the task by one tick of `dt` seconds.
    fn poll(&mut self, ctx: &mut Ctx, dt: f64) -> TaskStatus;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug)]
pub struct TaskSlot<T> {
    current: Option<(TaskId, T)>,
    next_id: u64,
}

impl<T> TaskSlot<T> {
    pub fn new() -> Self {
        Self {
            current: None,
            next_id: 0,
        }
    }

    /// Installs `task`, cancelling whatever task the slot held.
    pub fn spawn(&mut self, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.current = Some((id, task));
        id
    }

    /// Removes the running task, handing it back so the owner can unwind it.
    pub fn cancel(&mut self) -> Option<T> {
        self.current.take().map(|(_, task)| task)
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn id(&self) -> Option<TaskId> {
        self.current.as_ref().map(|(id, _)| *id)
    }

    pub fn get(&self) -> Option<&T> {
        self.current.as_ref().map(|(_, task)| task)
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.current.as_mut().map(|(_, task)| task)
    }

    /// Polls the running task. A finished task is removed from the slot.
    /// Returns `None` when the slot is empty.
    pub fn poll<Ctx: ?Sized>(&mut self, ctx: &mut Ctx, dt: f64) -> Option<TaskStatus>
    where
        T: TickTask<Ctx>,
    {
        let (_, task) = self.current.as_mut()?;
        let status = task.poll(ctx, dt);
        if status == TaskStatus::Finished {
            self.current = None;
        }
        Some(status)
    }
}

impl<T> Default for TaskSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
