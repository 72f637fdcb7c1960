//! Filter execution.
//!
//! [`FilterEngine::run`] drives one filter through its selectors:
//!
//! ```text
//! Parameters ──► Prepare ──► Start ──► Continue* ──► Finish
//!     │
//!     └─ skipped on repeat runs; persisted blocks are restored instead
//! ```
//!
//! Between selectors the host delivers the tiles the filter asked for and
//! collects the tile it wrote. Finish runs whenever Start was entered, even
//! after a failure or a cancellation. After a successful run the output is
//! post-processed for the chosen filter case and, unless the run was a
//! repeat, the filter's parameter and global blocks are persisted.
//!
//! # Example
//!
//! ```rust,ignore
//! use filterhost::config::HostConfig;
//! use filterhost::engine::{FilterEngine, RunOptions};
//! use filterhost::surface::FilterImages;
//!
//! let mut engine = FilterEngine::new(HostConfig::default());
//! let outcome = engine.run(&record, FilterImages::new(source), RunOptions::default())?;
//! // Run again with the same settings and no dialog.
//! let again = engine.run(&record, FilterImages::new(outcome.destination), RunOptions::default().with_repeat(true))?;
//! ```

pub mod filter_case;
mod memory_probe;
pub mod module;
pub mod persist;
pub mod phase;
pub mod pixels;
pub mod post;
pub(crate) mod session;
pub mod tiles;

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::rc::Rc;
use std::sync::Arc;

pub use filter_case::CaseSelection;
#[cfg(target_os = "linux")]
pub use memory_probe::ProcMapsProbe;
pub use memory_probe::{MemoryProbe, NullProbe};
pub use module::{LoadedModule, ModuleLoader, NativeLoader, StaticLoader};
pub use persist::{PersistedBlock, PersistedState, StorageMethod};

use crate::abi::context::{self, SharedSession};
use crate::abi::{AboutRecord, EntryPoint, ProcTables, RawHandle, Selector, play_info};
use crate::config::HostConfig;
use crate::discovery::LoadStrategy;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::observability::{self, RunMetrics};
use crate::plugin::{DataHandling, FilterCase, PluginRecord};
use crate::shim::{self, OutOfProcessShim, ShimRequest};
use crate::suites::{
    ColorServices, Dictionary, Handle, PropertyContext, ResourceSuite, SuiteRegistry,
};
use crate::surface::{FilterImages, Surface};

use session::{HostSession, SessionParts};

// ============================================================================
// Collaborators
// ============================================================================

/// Receives progress as a percentage.
pub trait ProgressSink {
    /// Report progress in `0..=100`.
    fn report(&mut self, percent: u8);
}

impl<F: FnMut(u8)> ProgressSink for F {
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

/// Polled by the filter to learn whether the user cancelled.
pub trait AbortPoll {
    /// Whether the run should stop.
    fn should_abort(&mut self) -> bool;
}

impl<F: FnMut() -> bool> AbortPoll for F {
    fn should_abort(&mut self) -> bool {
        self()
    }
}

/// Host color picker.
pub trait ColorPicker {
    /// Let the user pick a color, starting from `initial`. `None` means the
    /// user cancelled.
    fn pick(&mut self, prompt: &str, initial: [u8; 3]) -> Option<[u8; 3]>;
}

impl<F: FnMut(&str, [u8; 3]) -> Option<[u8; 3]>> ColorPicker for F {
    fn pick(&mut self, prompt: &str, initial: [u8; 3]) -> Option<[u8; 3]> {
        self(prompt, initial)
    }
}

/// Receives preview pixels the filter draws.
pub trait PreviewSink {
    /// Display `rgb` (packed RGB triplets, row-major) covering `area`.
    fn display(&mut self, area: Rect, rgb: &[u8]);
}

impl<F: FnMut(Rect, &[u8])> PreviewSink for F {
    fn display(&mut self, area: Rect, rgb: &[u8]) {
        self(area, rgb)
    }
}

// ============================================================================
// Options and outcome
// ============================================================================

/// Per-run settings and collaborators.
pub struct RunOptions {
    /// Foreground color.
    pub foreground: [u8; 3],
    /// Background color.
    pub background: [u8; 3],
    /// Repeat the last run with its persisted settings.
    pub repeat: bool,
    progress: Option<Box<dyn ProgressSink>>,
    abort: Option<Box<dyn AbortPoll>>,
    picker: Option<Box<dyn ColorPicker>>,
    preview: Option<Box<dyn PreviewSink>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            foreground: [0, 0, 0],
            background: [255, 255, 255],
            repeat: false,
            progress: None,
            abort: None,
            picker: None,
            preview: None,
        }
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("foreground", &self.foreground)
            .field("background", &self.background)
            .field("repeat", &self.repeat)
            .field("progress", &self.progress.is_some())
            .field("abort", &self.abort.is_some())
            .field("picker", &self.picker.is_some())
            .field("preview", &self.preview.is_some())
            .finish()
    }
}

impl RunOptions {
    /// Set the foreground and background colors.
    pub fn with_colors(mut self, foreground: [u8; 3], background: [u8; 3]) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    /// Request a repeat run.
    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    /// Forward progress to `sink`.
    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    /// Poll `poll` for cancellation.
    pub fn with_abort(mut self, poll: impl AbortPoll + 'static) -> Self {
        self.abort = Some(Box::new(poll));
        self
    }

    /// Answer choose-color requests with `picker`.
    pub fn with_picker(mut self, picker: impl ColorPicker + 'static) -> Self {
        self.picker = Some(Box::new(picker));
        self
    }

    /// Forward preview pixels to `sink`.
    pub fn with_preview(mut self, sink: impl PreviewSink + 'static) -> Self {
        self.preview = Some(Box::new(sink));
        self
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The filtered image.
    pub destination: Surface,
    /// Filter case the image was presented as.
    pub case: FilterCase,
    /// How the module was run.
    pub strategy: LoadStrategy,
    /// Tiles delivered to the filter.
    pub tiles_delivered: u64,
    /// Scripting descriptor the filter returned.
    pub descriptor: Option<Dictionary>,
}

// ============================================================================
// Engine
// ============================================================================

/// Runs filters and remembers their settings between runs.
pub struct FilterEngine {
    config: HostConfig,
    loader: Box<dyn ModuleLoader>,
    probe: Arc<dyn MemoryProbe>,
    shim: Option<Box<dyn OutOfProcessShim>>,
    persisted: HashMap<PluginRecord, PersistedState>,
}

impl std::fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEngine")
            .field("config", &self.config)
            .field("shim", &self.shim.is_some())
            .field("persisted", &self.persisted.len())
            .finish()
    }
}

impl FilterEngine {
    /// Create an engine that loads modules from disk.
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            loader: Box::new(NativeLoader),
            probe: Arc::new(NullProbe),
            shim: None,
            persisted: HashMap::new(),
        }
    }

    /// Resolve entry points through `loader`.
    pub fn with_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Inspect foreign memory through `probe`.
    pub fn with_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Run modules that need a helper process through `shim`.
    pub fn with_shim(mut self, shim: impl OutOfProcessShim + 'static) -> Self {
        self.shim = Some(Box::new(shim));
        self
    }

    /// Host configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Settings kept from the last run of `record`.
    pub fn persisted(&self, record: &PluginRecord) -> Option<&PersistedState> {
        self.persisted.get(record)
    }

    /// Replace the settings kept for `record`.
    pub fn set_persisted(&mut self, record: &PluginRecord, state: PersistedState) {
        self.persisted.insert(record.clone(), state);
    }

    /// Forget the settings kept for `record`.
    pub fn clear_persisted(&mut self, record: &PluginRecord) -> Option<PersistedState> {
        self.persisted.remove(record)
    }

    fn strategy(&self, record: &PluginRecord) -> Result<LoadStrategy> {
        let host = self.config.effective_architecture();
        let module = record.architecture();
        match LoadStrategy::for_module(host, module) {
            LoadStrategy::Incompatible => Err(Error::Incompatible { host, module }),
            strategy => Ok(strategy),
        }
    }

    /// Run `record` over `images`.
    pub fn run(
        &mut self,
        record: &PluginRecord,
        images: FilterImages,
        options: RunOptions,
    ) -> Result<RunOutcome> {
        let span = observability::span_run(record.category(), record.title());
        let _guard = span.enter();
        let metrics = RunMetrics::start(record.title());

        let result = self.strategy(record).and_then(|strategy| match strategy {
            LoadStrategy::OutOfProcess => self.run_shim(record, images, options),
            _ => self.run_in_process(record, images, options),
        });
        match &result {
            Ok(outcome) => {
                tracing::info!(case = ?outcome.case, tiles = outcome.tiles_delivered, "filter finished");
                metrics.succeeded();
            }
            Err(Error::Cancelled) => {
                tracing::info!("filter cancelled");
                metrics.cancelled();
            }
            Err(error) => {
                tracing::warn!(%error, "filter failed");
                metrics.failed();
            }
        }
        result
    }

    /// Settings to restore for a run, if it is a repeat run.
    fn repeat_state(&self, record: &PluginRecord, repeat: bool) -> Option<PersistedState> {
        if !repeat {
            return None;
        }
        let state = self.persisted.get(record).cloned();
        if state.is_none() {
            tracing::debug!("no persisted settings; running the parameters phase");
        }
        state
    }

    fn run_in_process(
        &mut self,
        record: &PluginRecord,
        images: FilterImages,
        options: RunOptions,
    ) -> Result<RunOutcome> {
        let selection = filter_case::select(record, &images)?;
        let RunOptions {
            foreground,
            background,
            repeat,
            progress,
            abort,
            picker,
            preview,
        } = options;
        let restore = self.repeat_state(record, repeat);

        let handling = selection.info.map_or(DataHandling::None, |info| info.input());
        let input = post::prepare_input(&images.source, handling, foreground, background);
        let mut destination = images.destination;
        post::prepare_destination(&selection, &mut destination);

        let module = self.loader.load(record)?;

        let properties = PropertyContext {
            document_width: images.source.width() as i32,
            document_height: images.source.height() as i32,
            channels: i32::from(selection.planes),
            title: record.title().to_string(),
            serial_string: self.config.serial_string.clone(),
            host_version: self.config.host_version,
        };
        let colors = ColorServices::new(foreground, background).with_picker(picker);
        let mut registry = SuiteRegistry::new(&self.config, properties, colors, self.probe.clone());
        if let Some(state) = &restore {
            registry.resources = ResourceSuite::from_entries(state.resources.clone());
        }

        let shared: SharedSession = Rc::new(RefCell::new(HostSession::new(SessionParts {
            registry,
            selection: selection.clone(),
            input,
            destination,
            foreground,
            background,
            host_signature: self.config.host_signature,
            max_space: self.config.max_buffer_space,
            progress,
            abort,
            preview,
            plugin: record.title().to_string(),
        })));

        let data = {
            let _active = context::install(shared.clone());
            drive(module.entry(), &shared, restore.as_ref())?
        };

        let mut session = Rc::try_unwrap(shared)
            .map_err(|_| Error::Config("filter session is still shared".into()))?
            .into_inner();

        let auto_mask = session.record().auto_mask != 0;
        post::finish_output(&selection, auto_mask, &images.source, &mut session.destination);

        let tiles_delivered = session.tiles_delivered();
        observability::record_tiles_delivered(record.title(), tiles_delivered);
        let descriptor = returned_descriptor(&session);
        if restore.is_none() {
            let state = capture_state(&session, data, descriptor.clone());
            tracing::debug!(
                parameters = state.parameters.is_some(),
                data = state.data.is_some(),
                "persisting filter settings"
            );
            self.persisted.insert(record.clone(), state);
        }

        Ok(RunOutcome {
            destination: session.destination,
            case: selection.case,
            strategy: LoadStrategy::InProcess,
            tiles_delivered,
            descriptor,
        })
    }

    fn run_shim(
        &mut self,
        record: &PluginRecord,
        images: FilterImages,
        options: RunOptions,
    ) -> Result<RunOutcome> {
        let shim = self
            .shim
            .as_ref()
            .ok_or_else(|| Error::Shim(format!("`{}` needs a shim and none is configured", record.title())))?;
        let selection = filter_case::select(record, &images)?;
        let restore = self.repeat_state(record, options.repeat);

        let request = ShimRequest {
            module_path: record.path().to_string_lossy().into_owned(),
            entry_point: record.entry_point().to_string(),
            filter_case: selection.case as i16,
            repeat: restore.is_some(),
            parameters: restore.as_ref().and_then(|s| s.parameters.clone()),
            data: restore.as_ref().and_then(|s| s.data.clone()),
            foreground: options.foreground,
            background: options.background,
            width: images.source.width(),
            height: images.source.height(),
            pixels: images.source.to_bytes(),
            mask: selection.mask.as_ref().map(|m| m.as_bytes().to_vec()),
        };
        tracing::debug!(module = %request.module_path, case = request.filter_case, "sending run to shim");

        let reply = shim.exchange(&shim::frame_request(&request)?)?;
        let (response, _) = shim::unframe_response(&reply)?
            .ok_or_else(|| Error::Shim("truncated reply".into()))?;
        if response.status != 0 {
            return Err(phase::status_error(response.status, response.error_string.as_deref()));
        }

        let mut destination = Surface::from_bytes(request.width, request.height, &response.pixels)
            .map_err(|e| Error::Shim(format!("bad pixel payload: {e}")))?;
        post::finish_output(&selection, true, &images.source, &mut destination);

        if restore.is_none() {
            self.persisted.insert(
                record.clone(),
                PersistedState {
                    parameters: response.parameters,
                    data: response.data,
                    ..PersistedState::default()
                },
            );
        }

        Ok(RunOutcome {
            destination,
            case: selection.case,
            strategy: LoadStrategy::OutOfProcess,
            tiles_delivered: 0,
            descriptor: None,
        })
    }

    /// Show the filter's about box.
    pub fn show_about(&self, record: &PluginRecord) -> Result<()> {
        if self.strategy(record)? != LoadStrategy::InProcess {
            return Err(Error::Shim("about boxes are only shown for in-process modules".into()));
        }
        let module = self.loader.load(record)?;
        let tables = ProcTables::new();
        let mut about = AboutRecord::new(tables.basic.as_ptr());
        let mut data: isize = 0;
        // SAFETY: `about` and the tables it points at outlive the call. No
        // session is installed, so suite calls fail with a logic error
        // rather than touching host state.
        let status = unsafe {
            phase::call(
                module.entry(),
                Selector::About,
                (&mut about as *mut AboutRecord).cast::<c_void>(),
                &mut data,
            )
        };
        match status {
            0 => Ok(()),
            status => Err(phase::status_error(status, None)),
        }
    }
}

// ============================================================================
// Selector sequence
// ============================================================================

/// Call one selector and surface its status and any tile failure.
fn invoke(entry: EntryPoint, selector: Selector, shared: &SharedSession, data: &mut isize) -> Result<()> {
    let record = shared.borrow().record_ptr();
    // SAFETY: The session owns the record and every table it points at and
    // is installed for the callbacks. No borrow of it is held across the
    // call.
    let status = unsafe { phase::call(entry, selector, record.cast(), data) };
    let mut session = shared.borrow_mut();
    if let Some(error) = session.tile_error.take() {
        return Err(error);
    }
    if status != 0 {
        return Err(phase::status_error(status, session.error_string().as_deref()));
    }
    Ok(())
}

fn restore_state(session: &mut HostSession, state: &PersistedState, data: &mut isize) -> Result<()> {
    if let Some(block) = &state.parameters {
        let addr = persist::restore(&mut session.registry, &mut session.restored, block)?;
        session.record_mut().parameters = addr as RawHandle;
    }
    if let Some(block) = &state.data {
        *data = persist::restore(&mut session.registry, &mut session.restored, block)? as isize;
    }
    if let Some(dictionary) = &state.descriptor {
        let handle = session
            .registry
            .descriptor_handle(dictionary.clone())
            .map_err(|status| Error::FilterFailed {
                status: status.os_err(),
                message: "could not restore the scripting descriptor".into(),
            })?;
        let params = session.descriptor_parameters_mut();
        params.descriptor = handle.as_raw();
        params.play_info = play_info::DONT_DISPLAY;
    }
    Ok(())
}

fn filter_tiles(entry: EntryPoint, shared: &SharedSession, data: &mut isize) -> Result<()> {
    shared.borrow_mut().advance()?;
    while !shared.borrow().requests_empty() {
        let cancelled = {
            let mut session = shared.borrow_mut();
            session.abort.as_mut().is_some_and(|poll| poll.should_abort())
        };
        if cancelled {
            return Err(Error::Cancelled);
        }
        invoke(entry, Selector::Continue, shared, data)?;
        shared.borrow_mut().advance()?;
    }
    Ok(())
}

/// Run every selector against the installed session and return the
/// filter's global data.
///
/// Finish is called once any selector has run, whichever phase failed; the
/// first failure is the one reported.
fn drive(entry: EntryPoint, shared: &SharedSession, restore: Option<&PersistedState>) -> Result<isize> {
    let mut data: isize = 0;
    let parameters = match restore {
        Some(state) => {
            restore_state(&mut shared.borrow_mut(), state, &mut data)?;
            Ok(())
        }
        None => invoke(entry, Selector::Parameters, shared, &mut data),
    };

    let filtered = parameters
        .and_then(|()| invoke(entry, Selector::Prepare, shared, &mut data))
        .and_then(|()| invoke(entry, Selector::Start, shared, &mut data))
        .and_then(|()| filter_tiles(entry, shared, &mut data));
    let finished = invoke(entry, Selector::Finish, shared, &mut data);
    filtered.and(finished)?;
    Ok(data)
}

fn returned_descriptor(session: &HostSession) -> Option<Dictionary> {
    let handle = Handle::from_raw(session.descriptor_parameters().descriptor)?;
    session.registry.descriptors.dictionary(handle).cloned()
}

fn capture_state(session: &HostSession, data: isize, descriptor: Option<Dictionary>) -> PersistedState {
    PersistedState {
        parameters: persist::capture(&session.registry, session.record().parameters as usize),
        data: persist::capture(&session.registry, data as usize),
        descriptor,
        resources: session.registry.resources.entries().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Architecture;
    use crate::surface::Bgra8;

    fn record(architecture: Architecture) -> PluginRecord {
        PluginRecord::new("/filters/x.8bf", "Main", "Cat", "Title", architecture)
    }

    fn images() -> FilterImages {
        FilterImages::new(Surface::filled(2, 2, Bgra8::from_rgba(1, 2, 3, 255)).unwrap())
    }

    #[test]
    fn test_incompatible_module_is_rejected() {
        let config = HostConfig::default().with_architecture(Architecture::X86);
        let mut engine = FilterEngine::new(config);
        let result = engine.run(&record(Architecture::X64), images(), RunOptions::default());
        assert!(matches!(
            result,
            Err(Error::Incompatible {
                host: Architecture::X86,
                module: Architecture::X64
            })
        ));
    }

    #[test]
    fn test_out_of_process_without_shim() {
        let config = HostConfig::default().with_architecture(Architecture::X64);
        let mut engine = FilterEngine::new(config);
        let result = engine.run(&record(Architecture::X86), images(), RunOptions::default());
        assert!(matches!(result, Err(Error::Shim(_))));
    }

    #[test]
    fn test_shim_round_trip() {
        let config = HostConfig::default().with_architecture(Architecture::X64);
        let shim = |request: &[u8]| -> Result<Vec<u8>> {
            let (request, _) = shim::unframe_request(request)?.expect("complete frame");
            let inverted: Vec<u8> = request
                .pixels
                .chunks_exact(4)
                .flat_map(|p| [255 - p[0], 255 - p[1], 255 - p[2], p[3]])
                .collect();
            shim::frame_response(&shim::ShimResponse {
                status: 0,
                error_string: None,
                parameters: Some(PersistedBlock {
                    method: StorageMethod::HandleSuite,
                    executable: false,
                    bytes: vec![7],
                }),
                data: None,
                pixels: inverted,
            })
        };
        let mut engine = FilterEngine::new(config).with_shim(shim);
        let rec = record(Architecture::X86);
        let outcome = engine.run(&rec, images(), RunOptions::default()).unwrap();
        assert_eq!(outcome.strategy, LoadStrategy::OutOfProcess);
        assert_eq!(outcome.destination.pixel(1, 1), Bgra8::from_rgba(254, 253, 252, 255));
        assert_eq!(engine.persisted(&rec).unwrap().parameters.as_ref().unwrap().bytes, vec![7]);
    }

    #[test]
    fn test_shim_failure_status() {
        let config = HostConfig::default().with_architecture(Architecture::X64);
        let shim = |_: &[u8]| -> Result<Vec<u8>> {
            shim::frame_response(&shim::ShimResponse {
                status: phase::REPORT_STRING,
                error_string: Some("no".into()),
                parameters: None,
                data: None,
                pixels: Vec::new(),
            })
        };
        let mut engine = FilterEngine::new(config).with_shim(shim);
        match engine.run(&record(Architecture::X86), images(), RunOptions::default()) {
            Err(Error::FilterFailed { message, .. }) => assert_eq!(message, "no"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_persisted_accessors() {
        let mut engine = FilterEngine::new(HostConfig::default());
        let rec = record(Architecture::current());
        assert!(engine.persisted(&rec).is_none());
        engine.set_persisted(&rec, PersistedState::default());
        assert!(engine.persisted(&rec).is_some());
        assert!(engine.clear_persisted(&rec).is_some());
        assert!(engine.persisted(&rec).is_none());
    }

    #[test]
    fn test_run_options_debug_hides_collaborators() {
        let options = RunOptions::default().with_abort(|| false);
        let text = format!("{options:?}");
        assert!(text.contains("abort: true"));
        assert!(text.contains("picker: false"));
    }
}
