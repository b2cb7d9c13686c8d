use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    tasks: VecDeque<Task>,
    running: usize,
    exit: bool,
}

struct State {
    queue: Mutex<Inner>,
    work_cv: Condvar,
    jobs_cv: Condvar,
}

/// Worker pool with a FIFO task queue.
///
/// The pool spawns one thread fewer than the requested parallelism; the
/// submitting thread contributes the last unit by draining queued tasks
/// inside `sync`, so a short queue cannot deadlock the caller. Tasks
/// queued but not synced before drop may or may not run.
pub struct TaskDispatch {
    state: Arc<State>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskDispatch {
    pub fn new(workers: usize) -> Self {
        assert!(workers >= 1);

        let state = Arc::new(State {
            queue: Mutex::new(Inner {
                tasks: VecDeque::new(),
                running: 0,
                exit: false,
            }),
            work_cv: Condvar::new(),
            jobs_cv: Condvar::new(),
        });

        let mut handles = Vec::with_capacity(workers - 1);
        for _ in 0..workers - 1 {
            let state = Arc::clone(&state);
            handles.push(thread::spawn(move || worker(&state)));
        }

        TaskDispatch {
            state,
            workers: handles,
        }
    }

    /// Non-blocking enqueue
    pub fn queue<F: FnOnce() + Send + 'static>(&self, f: F) {
        let mut inner = self.state.queue.lock();
        inner.tasks.push_back(Box::new(f));
        drop(inner);
        self.state.work_cv.notify_one();
    }

    /// Block until every queued task has completed, executing queued tasks
    /// on the calling thread while workers are busy.
    pub fn sync(&self) {
        let mut inner = self.state.queue.lock();
        loop {
            let Some(task) = inner.tasks.pop_front() else {
                break;
            };
            drop(inner);
            task();
            inner = self.state.queue.lock();
        }
        while inner.running > 0 {
            self.state.jobs_cv.wait(&mut inner);
        }
    }
}

fn worker(state: &State) {
    loop {
        let mut inner = state.queue.lock();
        while inner.tasks.is_empty() && !inner.exit {
            state.work_cv.wait(&mut inner);
        }
        if inner.exit {
            return;
        }
        let Some(task) = inner.tasks.pop_front() else {
            continue;
        };
        inner.running += 1;
        drop(inner);

        task();

        let mut inner = state.queue.lock();
        inner.running -= 1;
        let notify = inner.running == 0 && inner.tasks.is_empty();
        drop(inner);
        if notify {
            state.jobs_cv.notify_all();
        }
    }
}

impl Drop for TaskDispatch {
    fn drop(&mut self) {
        self.state.queue.lock().exit = true;
        self.state.work_cv.notify_all();
        for handle in self.workers.drain(..) {
            handle.join().ok();
        }
    }
}
