//! Task scheduling (§4.10): a single queue of boxed closures, run either
//! synchronously in the caller or on a dedicated worker thread guarded by
//! a mutex and condition variable. The spec calls for the latter
//! explicitly rather than a channel, so the queue is modeled directly
//! instead of reaching for `crossbeam`.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

pub struct Task {
    name: &'static str,
    job: Box<dyn FnOnce() + Send>,
}

impl Task {
    pub fn new(name: &'static str, job: impl FnOnce() + Send + 'static) -> Self {
        Task { name, job: Box::new(job) }
    }

    fn run(self) {
        log::trace!("running task {}", self.name);
        (self.job)();
    }
}

/// Runs every scheduled task synchronously, in the caller (`--single_threaded`).
#[derive(Default)]
pub struct SingleThreadedTaskRunner;

impl SingleThreadedTaskRunner {
    pub fn schedule_task(&self, task: Task) {
        task.run();
    }

    pub fn clear_pending_tasks(&self) {}
}

struct Shared {
    queue: Mutex<Vec<Task>>,
    condvar: Condvar,
    quit: Mutex<bool>,
}

/// Owns a worker thread, a mutex-guarded queue, and a condition variable
/// the worker waits on when the queue is empty (§4.10).
pub struct TaskRunner {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl TaskRunner {
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Vec::new()),
            condvar: Condvar::new(),
            quit: Mutex::new(false),
        });
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("kestrel-main-thread".into())
            .spawn(move || Self::worker_loop(worker_shared))
            .expect("failed to spawn main-thread worker");
        TaskRunner {
            shared,
            worker: Some(worker),
        }
    }

    fn worker_loop(shared: Arc<Shared>) {
        loop {
            if *shared.quit.lock().unwrap() {
                return;
            }
            let task = {
                let mut queue = shared.queue.lock().unwrap();
                while queue.is_empty() && !*shared.quit.lock().unwrap() {
                    queue = shared.condvar.wait(queue).unwrap();
                }
                if *shared.quit.lock().unwrap() {
                    return;
                }
                queue.remove(0)
            };
            task.run();
        }
    }

    pub fn schedule_task(&self, task: Task) {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.push(task);
        self.shared.condvar.notify_one();
    }

    pub fn clear_pending_tasks(&self) {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.clear();
    }

    pub fn set_needs_quit(&self) {
        *self.shared.quit.lock().unwrap() = true;
        self.shared.condvar.notify_all();
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.set_needs_quit();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn single_threaded_runner_runs_tasks_inline() {
        let runner = SingleThreadedTaskRunner::default();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        runner.schedule_task(Task::new("inc", move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn multithreaded_runner_eventually_runs_scheduled_task() {
        let runner = TaskRunner::new();
        let ran = Arc::new((Mutex::new(false), Condvar::new()));
        let ran_clone = ran.clone();
        runner.schedule_task(Task::new("flag", move || {
            let mut done = ran_clone.0.lock().unwrap();
            *done = true;
            ran_clone.1.notify_all();
        }));
        let (lock, cvar) = &*ran;
        let mut done = lock.lock().unwrap();
        while !*done {
            done = cvar.wait(done).unwrap();
        }
        assert!(*done);
    }

    #[test]
    fn clear_pending_tasks_empties_queue_before_worker_picks_them_up() {
        let runner = TaskRunner::new();
        runner.set_needs_quit();
        runner.clear_pending_tasks();
        let queue = runner.shared.queue.lock().unwrap();
        assert!(queue.is_empty());
    }
}
