//! Lazy SMP: helper threads run their own iterative deepening on a copy of
//! the root and talk to the primary only through the shared table.
//!
//! Helpers are long-lived. Each parks in an idle loop on a mutex and
//! condition variable until it is handed a task.

use std::panic;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chess_core::Position;

use crate::search::{SearchContext, SearchWorker, WorkerResult};

const SEARCH_STACK_SIZE: usize = 64 * 1024 * 1024;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Task {
    Search(Box<(SearchContext, Position)>),
    ClearHistories,
}

struct HelperState {
    busy: bool,
    exit: bool,
    task: Option<Task>,
}

struct HelperInner {
    worker: Mutex<SearchWorker>,
    state: Mutex<HelperState>,
    condvar: Condvar,
}

struct Helper {
    inner: Arc<HelperInner>,
    handle: Option<JoinHandle<()>>,
}

impl Helper {
    fn spawn(id: usize) -> std::io::Result<Helper> {
        let inner = Arc::new(HelperInner {
            worker: Mutex::new(SearchWorker::new(id)),
            state: Mutex::new(HelperState {
                busy: true,
                exit: false,
                task: None,
            }),
            condvar: Condvar::new(),
        });
        let thread_inner = Arc::clone(&inner);
        let handle = thread::Builder::new()
            .name(format!("search-{id}"))
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || idle_loop(thread_inner))?;
        let helper = Helper {
            inner,
            handle: Some(handle),
        };
        helper.wait_idle();
        Ok(helper)
    }

    fn schedule(&self, task: Task) {
        let mut state = lock(&self.inner.state);
        while state.busy {
            state = self
                .inner
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.task = Some(task);
        state.busy = true;
        self.inner.condvar.notify_all();
    }

    fn wait_idle(&self) {
        let mut state = lock(&self.inner.state);
        while state.busy {
            state = self
                .inner
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for Helper {
    fn drop(&mut self) {
        {
            let mut state = lock(&self.inner.state);
            state.exit = true;
            self.inner.condvar.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn idle_loop(inner: Arc<HelperInner>) {
    loop {
        let task = {
            let mut state = lock(&inner.state);
            state.busy = false;
            inner.condvar.notify_all();
            while state.task.is_none() && !state.exit {
                state = inner.condvar.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            if state.exit {
                return;
            }
            state.task.take()
        };

        let mut worker = lock(&inner.worker);
        match task {
            Some(Task::Search(task)) => {
                let (ctx, mut pos) = *task;
                worker.iterate(&ctx, &mut pos);
            }
            Some(Task::ClearHistories) => worker.clear(),
            None => {}
        }
    }
}

/// The primary worker plus `threads - 1` helpers.
pub struct ThreadPool {
    primary: SearchWorker,
    helpers: Vec<Helper>,
}

impl ThreadPool {
    pub fn new(threads: usize) -> Self {
        let mut pool = Self {
            primary: SearchWorker::new(0),
            helpers: Vec::new(),
        };
        pool.set_threads(threads);
        pool
    }

    /// Total thread count, the primary included.
    pub fn threads(&self) -> usize {
        self.helpers.len() + 1
    }

    pub fn set_threads(&mut self, threads: usize) {
        let wanted = threads.max(1) - 1;
        if wanted == self.helpers.len() {
            return;
        }
        self.wait_idle();
        self.helpers.clear();
        for id in 1..=wanted {
            match Helper::spawn(id) {
                Ok(helper) => self.helpers.push(helper),
                Err(e) => {
                    log::warn!("could not start search thread {id}: {e}; using {id} threads");
                    break;
                }
            }
        }
        log::debug!("thread pool resized to {} threads", self.threads());
    }

    fn wait_idle(&self) {
        for helper in &self.helpers {
            helper.wait_idle();
        }
    }

    /// Reset every worker's move-ordering history.
    pub fn clear_histories(&mut self) {
        self.primary.clear();
        for helper in &self.helpers {
            helper.schedule(Task::ClearHistories);
        }
        self.wait_idle();
    }

    /// Run one search on all threads and return the primary's result.
    ///
    /// Helpers are stopped as soon as the primary finishes.
    pub fn search(&mut self, ctx: &SearchContext, pos: &Position) -> WorkerResult {
        for helper in &self.helpers {
            helper.schedule(Task::Search(Box::new((ctx.clone(), pos.clone()))));
        }

        let primary = &mut self.primary;
        let mut root = pos.clone();
        let threaded = thread::scope(|s| {
            let spawned = thread::Builder::new()
                .name("search-0".to_string())
                .stack_size(SEARCH_STACK_SIZE)
                .spawn_scoped(s, || primary.iterate(ctx, &mut root));
            match spawned {
                Ok(handle) => Some(
                    handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload)),
                ),
                Err(e) => {
                    log::warn!("could not start primary search thread: {e}; searching inline");
                    None
                }
            }
        });
        let result = match threaded {
            Some(result) => result,
            None => self.primary.iterate(ctx, &mut pos.clone()),
        };

        ctx.time.stop();
        self.wait_idle();
        result
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.wait_idle();
    }
}
