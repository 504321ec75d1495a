//! Binding module loader
//!
//! Bindings are named modules of host functionality, registered once in a
//! process-wide [`BindingCatalog`] and evaluated lazily in each execution
//! context. Each context keeps one [`ModuleRecord`] per binding name:
//!
//! ```text
//! Uncompiled ──► Compiled ──► Evaluating ──► Evaluated
//!      │                           │
//!      └──────────► Failed ◄───────┘
//! ```
//!
//! A module never re-enters `Evaluating`. Requiring a module that is still
//! evaluating fails immediately with [`BridgeError::CircularDependency`], and
//! a failed module replays its error without running its body again.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::ExecutionContext;
use crate::error::{BridgeError, RegistrationKind, Result};
use crate::host_module::{ALT, CPP_BINDINGS};
use crate::value::{ScriptFunction, ScriptValue};

/// Evaluated module namespace
pub type ModuleNamespace = Arc<HashMap<String, ScriptValue>>;

/// Compiled module body
pub type ModuleBody = Arc<dyn Fn(&ModuleScope<'_>) -> Result<()> + Send + Sync>;

/// Globals visible only while bindings initialize
pub const TEMPORARY_GLOBALS: [&str; 3] = ["__alt", "__cppBindings", "requireBinding"];

/// Which side a binding is loaded on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingScope {
    Shared,
    Server,
    Client,
}

impl fmt::Display for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Server => write!(f, "server"),
            Self::Client => write!(f, "client"),
        }
    }
}

/// Where a binding's code comes from
#[derive(Clone)]
pub enum BindingSource {
    /// Rust module body; always compiles
    Native(ModuleBody),
    /// Script text, compiled through the host's [`ScriptCompiler`]
    Script(String),
}

/// Compiles script-text bindings into module bodies
pub trait ScriptCompiler: Send + Sync {
    fn compile(&self, name: &str, source: &str) -> std::result::Result<ModuleBody, String>;
}

/// A registered binding
pub struct Binding {
    name: String,
    scope: BindingScope,
    source: BindingSource,
}

impl Binding {
    /// Binding backed by a Rust module body
    pub fn native<F>(name: impl Into<String>, scope: BindingScope, body: F) -> Self
    where
        F: Fn(&ModuleScope<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            scope,
            source: BindingSource::Native(Arc::new(body)),
        }
    }

    /// Binding backed by script text
    pub fn script(name: impl Into<String>, scope: BindingScope, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope,
            source: BindingSource::Script(source.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> BindingScope {
        self.scope
    }

    pub fn source(&self) -> &BindingSource {
        &self.source
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Process-wide set of bindings, in registration order
#[derive(Default)]
pub struct BindingCatalog {
    bindings: RwLock<Vec<Arc<Binding>>>,
    compiler: RwLock<Option<Arc<dyn ScriptCompiler>>>,
}

impl BindingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding; names are unique
    pub fn register(&self, binding: Binding) -> Result<()> {
        let mut bindings = self.bindings.write();
        if bindings.iter().any(|b| b.name == binding.name) {
            log::warn!("Binding '{}' already registered", binding.name);
            return Err(BridgeError::duplicate(RegistrationKind::Binding, binding.name));
        }
        log::debug!("Registered {} binding '{}'", binding.scope, binding.name);
        bindings.push(Arc::new(binding));
        Ok(())
    }

    /// Install the compiler used for script-text bindings
    pub fn set_compiler(&self, compiler: Arc<dyn ScriptCompiler>) {
        *self.compiler.write() = Some(compiler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Binding>> {
        self.bindings.read().iter().find(|b| b.name == name).cloned()
    }

    /// Bindings of one scope, in registration order
    pub fn for_scope(&self, scope: BindingScope) -> Vec<Arc<Binding>> {
        self.bindings
            .read()
            .iter()
            .filter(|b| b.scope == scope)
            .cloned()
            .collect()
    }

    /// First binding matching a predicate
    pub fn find(&self, predicate: impl Fn(&Binding) -> bool) -> Option<Arc<Binding>> {
        self.bindings.read().iter().find(|b| predicate(b)).cloned()
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    fn compile(&self, binding: &Binding) -> std::result::Result<ModuleBody, String> {
        match &binding.source {
            BindingSource::Native(body) => Ok(body.clone()),
            BindingSource::Script(source) => {
                let compiler = self.compiler.read().clone();
                match compiler {
                    Some(compiler) => compiler.compile(&binding.name, source),
                    None => Err("no script compiler configured".to_string()),
                }
            }
        }
    }
}

/// Lifecycle of a module within one context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    Uncompiled,
    Compiled,
    Evaluating,
    Evaluated,
    Failed,
}

impl Default for ModuleStatus {
    fn default() -> Self {
        Self::Uncompiled
    }
}

/// Per-context state of one binding
#[derive(Default)]
pub struct ModuleRecord {
    status: ModuleStatus,
    body: Option<ModuleBody>,
    namespace: Option<ModuleNamespace>,
    error: Option<BridgeError>,
    /// Set when the module was required while evaluating
    reentered: bool,
}

impl ModuleRecord {
    pub fn status(&self) -> ModuleStatus {
        self.status
    }
}

/// Per-context module records
#[derive(Default)]
pub struct ModuleCache {
    records: RwLock<HashMap<String, ModuleRecord>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, name: &str) -> ModuleStatus {
        self.records
            .read()
            .get(name)
            .map(ModuleRecord::status)
            .unwrap_or(ModuleStatus::Uncompiled)
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }
}

/// What a module body sees while it evaluates
pub struct ModuleScope<'a> {
    context: &'a ExecutionContext,
    name: &'a str,
    exports: RefCell<HashMap<String, ScriptValue>>,
}

impl<'a> ModuleScope<'a> {
    fn new(context: &'a ExecutionContext, name: &'a str) -> Self {
        Self {
            context,
            name,
            exports: RefCell::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &'a ExecutionContext {
        self.context
    }

    /// Name of the module being evaluated
    pub fn name(&self) -> &str {
        self.name
    }

    /// Add a member to the module namespace
    pub fn export(&self, name: impl Into<String>, value: impl Into<ScriptValue>) {
        self.exports.borrow_mut().insert(name.into(), value.into());
    }

    /// Load another binding
    pub fn require(&self, name: &str) -> Result<ModuleNamespace> {
        self.context.require_binding(name)
    }

    /// Read a global of the context
    pub fn global(&self, name: &str) -> Option<ScriptValue> {
        self.context.global(name)
    }

    fn into_namespace(self) -> ModuleNamespace {
        Arc::new(self.exports.into_inner())
    }
}

/// Outcome of initializing the bindings of one scope
#[derive(Debug, Default)]
pub struct InitializeReport {
    pub evaluated: Vec<String>,
    pub failed: Vec<(String, BridgeError)>,
}

impl InitializeReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Global installed for the lifetime of the guard
///
/// Dropping the guard restores whatever the global held before.
pub struct TemporaryGlobal<'a> {
    context: &'a ExecutionContext,
    name: &'static str,
    previous: Option<ScriptValue>,
}

impl<'a> TemporaryGlobal<'a> {
    pub fn install(context: &'a ExecutionContext, name: &'static str, value: ScriptValue) -> Self {
        let previous = context.set_global(name, value);
        Self {
            context,
            name,
            previous,
        }
    }
}

impl Drop for TemporaryGlobal<'_> {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => {
                self.context.set_global(self.name, previous);
            }
            None => {
                self.context.remove_global(self.name);
            }
        }
    }
}

fn install_temporaries(context: &ExecutionContext) -> [TemporaryGlobal<'_>; 3] {
    let require = ScriptFunction::new("requireBinding", |context: &ExecutionContext, args| {
        let args = crate::args::FunctionArgs::new("requireBinding", args);
        args.check_count(1)?;
        let namespace = context.require_binding(args.string(0)?)?;
        Ok(ScriptValue::Object((*namespace).clone()))
    });

    [
        TemporaryGlobal::install(context, TEMPORARY_GLOBALS[0], ALT.namespace(context)),
        TemporaryGlobal::install(context, TEMPORARY_GLOBALS[1], CPP_BINDINGS.namespace(context)),
        TemporaryGlobal::install(context, TEMPORARY_GLOBALS[2], ScriptValue::Function(require)),
    ]
}

/// Load a binding by name
pub(crate) fn require(context: &ExecutionContext, name: &str) -> Result<ModuleNamespace> {
    let binding = context
        .catalog()
        .get(name)
        .ok_or_else(|| BridgeError::argument(format!("invalid binding name: {}", name)))?;
    load(context, &binding)
}

/// Flag every module still evaluating as part of a cycle
fn mark_cycle(records: &mut HashMap<String, ModuleRecord>) {
    for record in records.values_mut() {
        if record.status == ModuleStatus::Evaluating {
            record.reentered = true;
        }
    }
}

/// Drive one module through its state machine
pub(crate) fn load(context: &ExecutionContext, binding: &Binding) -> Result<ModuleNamespace> {
    let name = binding.name();
    let modules = context.modules();
    // Every record in `Evaluating` belongs to this thread's require chain
    let _runtime = context.lock_runtime();

    // Settled states answer from the cache
    let needs_compile = {
        let mut records = modules.records.write();
        let record = records.entry(name.to_string()).or_default();
        match record.status() {
            ModuleStatus::Evaluated => {
                return record
                    .namespace
                    .clone()
                    .ok_or_else(|| {
                        BridgeError::internal(format!("{} evaluated without namespace", name))
                    });
            }
            ModuleStatus::Failed => {
                return Err(record
                    .error
                    .clone()
                    .unwrap_or_else(|| {
                        BridgeError::internal(format!("{} failed without error", name))
                    }));
            }
            ModuleStatus::Evaluating => {
                mark_cycle(&mut records);
                log::error!(
                    "[{}] Binding '{}' required while evaluating, circular dependency?",
                    context.resource_name(),
                    name
                );
                return Err(BridgeError::CircularDependency(name.to_string()));
            }
            ModuleStatus::Uncompiled => true,
            ModuleStatus::Compiled => false,
        }
    };

    // Compile without holding the cache lock
    let compiled = if needs_compile {
        Some(context.catalog().compile(binding))
    } else {
        None
    };

    let body = {
        let mut records = modules.records.write();
        let record = records.entry(name.to_string()).or_default();
        match compiled {
            Some(Ok(body)) => {
                record.body = Some(body);
                record.status = ModuleStatus::Compiled;
                log::debug!("[{}] Compiled binding '{}'", context.resource_name(), name);
            }
            Some(Err(message)) => {
                let err = BridgeError::internal(format!("compile failed: {}: {}", name, message));
                record.status = ModuleStatus::Failed;
                record.error = Some(err.clone());
                return Err(err);
            }
            None => {}
        }

        // Another caller may have settled the module meanwhile
        match record.status() {
            ModuleStatus::Evaluated => {
                if let Some(namespace) = record.namespace.clone() {
                    return Ok(namespace);
                }
            }
            ModuleStatus::Failed => {
                if let Some(err) = record.error.clone() {
                    return Err(err);
                }
            }
            ModuleStatus::Evaluating => {
                mark_cycle(&mut records);
                return Err(BridgeError::CircularDependency(name.to_string()));
            }
            ModuleStatus::Uncompiled | ModuleStatus::Compiled => {}
        }

        let body = record
            .body
            .clone()
            .ok_or_else(|| BridgeError::internal(format!("{} compiled without body", name)))?;
        record.status = ModuleStatus::Evaluating;
        body
    };

    log::debug!("[{}] Evaluating binding '{}'", context.resource_name(), name);
    let outcome = {
        let scope = ModuleScope::new(context, name);
        body(&scope).map(|()| scope.into_namespace())
    };

    let mut records = modules.records.write();
    let record = records.entry(name.to_string()).or_default();
    record.body = None;

    let result = match outcome {
        Ok(_) if record.reentered => Err(BridgeError::CircularDependency(name.to_string())),
        Ok(namespace) => Ok(namespace),
        Err(err @ BridgeError::CircularDependency(_)) => Err(err),
        Err(err) => Err(BridgeError::internal(format!(
            "evaluate failed: {}: {}",
            name, err
        ))),
    };

    match &result {
        Ok(namespace) => {
            record.status = ModuleStatus::Evaluated;
            record.namespace = Some(namespace.clone());
            log::debug!("[{}] Evaluated binding '{}'", context.resource_name(), name);
        }
        Err(err) => {
            record.status = ModuleStatus::Failed;
            record.error = Some(err.clone());
        }
    }
    result
}

/// Evaluate every binding of a scope except the bootstrap binding
pub(crate) fn initialize_bindings(
    context: &ExecutionContext,
    scope: BindingScope,
) -> InitializeReport {
    let _temporaries = install_temporaries(context);
    let mut report = InitializeReport::default();

    for binding in context.catalog().for_scope(scope) {
        if context.config().is_bootstrap(binding.name()) {
            continue;
        }
        match load(context, &binding) {
            Ok(_) => report.evaluated.push(binding.name().to_string()),
            Err(err) => {
                log::error!(
                    "[{}] Failed to initialize binding '{}': {}",
                    context.resource_name(),
                    binding.name(),
                    err
                );
                report.failed.push((binding.name().to_string(), err));
            }
        }
    }

    log::debug!(
        "[{}] Initialized {} {} bindings ({} failed)",
        context.resource_name(),
        report.evaluated.len(),
        scope,
        report.failed.len()
    );
    report
}

/// Evaluate the bootstrap binding of this side, if one is registered
pub(crate) fn initialize_bootstrap(context: &ExecutionContext) -> Result<Option<ModuleNamespace>> {
    let config = context.config();
    let side = config.side.binding_scope();
    let loaded = |b: &Binding| b.scope() == BindingScope::Shared || b.scope() == side;
    let Some(binding) = context
        .catalog()
        .find(|b| loaded(b) && config.is_bootstrap(b.name()))
    else {
        return Ok(None);
    };
    let _temporaries = install_temporaries(context);
    load(context, &binding).map(Some)
}
