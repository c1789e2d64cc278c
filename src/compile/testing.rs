//! In-process compiler double.

use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::CompilationError;

use super::{Artifact, CompileRequest, CompileService, Compiler, Target};

/// Copies each entry source to its output path.
///
/// `fail` makes every later pass for a target reject until `recover`;
/// `pause` holds every pass that starts until `resume`.
#[derive(Default)]
pub struct FakeCompiler {
    state: std::sync::Arc<FakeState>,
}

#[derive(Default)]
struct FakeState {
    started: AtomicUsize,
    compiled: AtomicUsize,
    stopped: AtomicUsize,
    entered: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    paused: AtomicBool,
    failure: Mutex<Option<(Target, String)>>,
    requests: Mutex<Vec<CompileRequest>>,
}

impl FakeCompiler {
    pub fn fail(&self, target: Target, message: &str) {
        *self.state.failure.lock() = Some((target, message.to_string()));
    }

    pub fn recover(&self) {
        *self.state.failure.lock() = None;
    }

    pub fn pause(&self) {
        self.state.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.state.paused.store(false, Ordering::SeqCst);
    }

    /// Passes that have begun, finished or not.
    pub fn entered(&self) -> usize {
        self.state.entered.load(Ordering::SeqCst)
    }

    /// Most passes ever running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.state.started.load(Ordering::SeqCst)
    }

    pub fn compiled(&self) -> usize {
        self.state.compiled.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.state.stopped.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompileRequest> {
        self.state.requests.lock().clone()
    }
}

impl Compiler for FakeCompiler {
    fn start(&self, _target: Target) -> Result<Box<dyn CompileService>, CompilationError> {
        self.state.started.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeService {
            state: self.state.clone(),
        }))
    }
}

struct FakeService {
    state: std::sync::Arc<FakeState>,
}

impl CompileService for FakeService {
    fn compile(&mut self, request: &CompileRequest) -> Result<Artifact, CompilationError> {
        let state = &self.state;
        state.requests.lock().push(request.clone());
        state.entered.fetch_add(1, Ordering::SeqCst);
        let running = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(running, Ordering::SeqCst);
        while state.paused.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }
        let result = self.finish(request);
        state.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn stop(&mut self) {
        self.state.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

impl FakeService {
    fn finish(&self, request: &CompileRequest) -> Result<Artifact, CompilationError> {
        if let Some((target, message)) = self.state.failure.lock().clone()
            && target == request.target
        {
            return Err(CompilationError::new(target, message));
        }

        let source = fs::read_to_string(&request.entry)
            .map_err(|e| CompilationError::new(request.target, e.to_string()))?;
        let entry = request.output_entry();
        fs::write(&entry, source).map_err(|e| CompilationError::new(request.target, e.to_string()))?;
        self.state.compiled.fetch_add(1, Ordering::SeqCst);

        Ok(Artifact {
            target: request.target,
            dir: request.out_dir.clone(),
            entry,
        })
    }
}
