//! Handler Registry
//!
//! Stores option callbacks by generated handler id so the host can refer
//! back to them.
//!
//! ## Generations
//!
//! Every mapped result set is a *generation* opened under a *context*:
//!
//! ```text
//! onQuery "a"   ──► G1 (Root)          ids a1, a2
//! onQuery "ab"  ──► G2 (Root)          ids b1, b2
//! onOptionQuery b2 "x" ──► G3 (Handler b2)   ids c1
//! onQuery "abc" ──► G4 (Root)          evicts G1 (retained = 2)
//! onQuery "abcd" ─► G5 (Root)          evicts G2, and G3 with it
//! ```
//!
//! Only the newest `retained` generations of a context stay live. Evicting a
//! generation removes its handler ids and, recursively, every generation
//! opened under one of those ids. Keeping more than one generation lets a
//! host request that races with a superseding query still resolve.
//!
//! Generations opened under a handler id that is already gone are orphans.
//! Nothing can supersede them through their context, so they are kept in a
//! separate queue bounded by the same `retained` count.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::error::{HandlerKind, RegistryError};
use crate::types::{ActionHandler, OptionCallback, PluginOption, QueryHandler};
use spotter_core::MappedOption;

/// Generations kept per context unless configured otherwise.
pub const DEFAULT_RETAINED_GENERATIONS: usize = 2;

/// Generate a handler id: 128 random bits, hex encoded.
fn generate_handler_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// =============================================================================
// Keys
// =============================================================================

/// Identifies one result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationId(u64);

/// Where a result set came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GenerationContext {
    /// The plugin's top-level query hook.
    Root,

    /// An option callback, by handler id.
    Handler(String),
}

// =============================================================================
// State
// =============================================================================

struct Registered {
    generation: GenerationId,
    callback: OptionCallback,
}

struct Generation {
    context: GenerationContext,
    handler_ids: Vec<String>,
}

#[derive(Default)]
struct RegistryState {
    next_generation: u64,

    /// Live handlers by id.
    handlers: HashMap<String, Registered>,

    /// Live generations by id.
    generations: HashMap<GenerationId, Generation>,

    /// Live generations per context, oldest first.
    contexts: HashMap<GenerationContext, VecDeque<GenerationId>>,

    /// Generations whose context handler was already evicted, oldest first.
    orphans: VecDeque<GenerationId>,
}

impl RegistryState {
    fn open(&mut self, context: GenerationContext, retained: usize) -> GenerationId {
        let id = GenerationId(self.next_generation);
        self.next_generation += 1;

        let orphaned = match &context {
            GenerationContext::Root => false,
            GenerationContext::Handler(handler_id) => !self.handlers.contains_key(handler_id),
        };

        self.generations.insert(
            id,
            Generation {
                context: context.clone(),
                handler_ids: Vec::new(),
            },
        );

        let queue = if orphaned {
            tracing::debug!("Generation {} opened under evicted handler", id.0);
            &mut self.orphans
        } else {
            self.contexts.entry(context).or_default()
        };
        queue.push_back(id);

        let mut superseded = Vec::new();
        while queue.len() > retained {
            if let Some(old) = queue.pop_front() {
                superseded.push(old);
            }
        }
        for old in superseded {
            self.evict(old);
        }

        id
    }

    fn insert(
        &mut self,
        generation: GenerationId,
        callback: OptionCallback,
    ) -> Result<String, RegistryError> {
        let Some(entry) = self.generations.get_mut(&generation) else {
            return Err(RegistryError::GenerationEvicted(generation.0));
        };

        let mut id = generate_handler_id();
        while self.handlers.contains_key(&id) {
            id = generate_handler_id();
        }

        entry.handler_ids.push(id.clone());
        self.handlers.insert(
            id.clone(),
            Registered {
                generation,
                callback,
            },
        );
        Ok(id)
    }

    fn evict(&mut self, generation: GenerationId) {
        let Some(entry) = self.generations.remove(&generation) else {
            return;
        };

        if let Some(queue) = self.contexts.get_mut(&entry.context) {
            queue.retain(|g| *g != generation);
            if queue.is_empty() {
                self.contexts.remove(&entry.context);
            }
        }
        self.orphans.retain(|g| *g != generation);

        tracing::debug!(
            "Evicting generation {} ({} handlers)",
            generation.0,
            entry.handler_ids.len()
        );

        for handler_id in entry.handler_ids {
            self.handlers.remove(&handler_id);
            let context = GenerationContext::Handler(handler_id);
            if let Some(children) = self.contexts.remove(&context) {
                for child in children {
                    self.evict(child);
                }
            }
        }
    }
}

// =============================================================================
// Handler Registry
// =============================================================================

/// Registry of option callbacks, indexed by handler id and generation.
pub struct HandlerRegistry {
    state: Mutex<RegistryState>,
    retained: usize,
}

impl HandlerRegistry {
    /// Create a registry keeping the default number of generations.
    pub fn new() -> Self {
        Self::with_retained_generations(DEFAULT_RETAINED_GENERATIONS)
    }

    /// Create a registry keeping `retained` generations per context.
    ///
    /// Values below 1 are raised to 1.
    pub fn with_retained_generations(retained: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            retained: retained.max(1),
        }
    }

    /// Open a new generation, superseding old ones of the same context.
    pub fn begin_generation(&self, context: GenerationContext) -> GenerationId {
        self.state.lock().open(context, self.retained)
    }

    /// Register an action callback in a generation.
    pub fn register_action(
        &self,
        generation: GenerationId,
        action: ActionHandler,
    ) -> Result<String, RegistryError> {
        self.state
            .lock()
            .insert(generation, OptionCallback::Action(action))
    }

    /// Register a query callback in a generation.
    pub fn register_query(
        &self,
        generation: GenerationId,
        query: QueryHandler,
    ) -> Result<String, RegistryError> {
        self.state
            .lock()
            .insert(generation, OptionCallback::Query(query))
    }

    /// Look up a live action callback.
    pub fn resolve_action(&self, id: &str) -> Result<ActionHandler, RegistryError> {
        match self.state.lock().handlers.get(id) {
            Some(Registered {
                callback: OptionCallback::Action(action),
                ..
            }) => Ok(action.clone()),
            _ => Err(RegistryError::UnknownHandler {
                kind: HandlerKind::Action,
                id: id.to_string(),
            }),
        }
    }

    /// Look up a live query callback.
    pub fn resolve_query(&self, id: &str) -> Result<QueryHandler, RegistryError> {
        match self.state.lock().handlers.get(id) {
            Some(Registered {
                callback: OptionCallback::Query(query),
                ..
            }) => Ok(query.clone()),
            _ => Err(RegistryError::UnknownHandler {
                kind: HandlerKind::Query,
                id: id.to_string(),
            }),
        }
    }

    /// Project options to their wire form as one new generation.
    ///
    /// Each callback is registered under a fresh id, which replaces it in
    /// the mapped option.
    pub fn map_options(
        &self,
        context: GenerationContext,
        options: Vec<PluginOption>,
    ) -> Vec<MappedOption> {
        let mut state = self.state.lock();
        let generation = state.open(context, self.retained);

        let mut mapped_options = Vec::with_capacity(options.len());
        for option in options {
            let (mut mapped, callback) = option.into_parts();
            if let Some(callback) = callback {
                let is_action = matches!(callback, OptionCallback::Action(_));
                // The generation was opened under this lock, it cannot be gone.
                if let Ok(id) = state.insert(generation, callback) {
                    if is_action {
                        mapped.action_id = Some(id);
                    } else {
                        mapped.on_query_id = Some(id);
                    }
                }
            }
            mapped_options.push(mapped);
        }
        mapped_options
    }

    /// Check whether a handler id is live.
    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().handlers.contains_key(id)
    }

    /// Number of live handlers.
    pub fn handler_count(&self) -> usize {
        self.state.lock().handlers.len()
    }

    /// Number of live generations.
    pub fn generation_count(&self) -> usize {
        self.state.lock().generations.len()
    }

    /// Drop every handler and generation.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        let count = state.handlers.len();
        state.handlers.clear();
        state.generations.clear();
        state.contexts.clear();
        state.orphans.clear();
        tracing::info!("Handler registry flushed ({} handlers)", count);
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OptionOutcome;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn action_option(name: &str) -> PluginOption {
        PluginOption::new(name).with_action(|| async { Ok(true) })
    }

    fn completing_action() -> ActionHandler {
        match action_option("x").callback {
            Some(OptionCallback::Action(action)) => action,
            other => panic!("Expected action callback, got {:?}", other),
        }
    }

    fn query_option(name: &str) -> PluginOption {
        PluginOption::new(name).with_query(|_query| async { Ok(Vec::<PluginOption>::new()) })
    }

    #[test]
    fn test_plain_option_gets_no_ids() {
        let registry = HandlerRegistry::new();
        let mapped = registry.map_options(GenerationContext::Root, vec![PluginOption::new("a")]);

        assert_eq!(mapped.len(), 1);
        assert!(mapped[0].action_id.is_none());
        assert!(mapped[0].on_query_id.is_none());
        assert_eq!(registry.handler_count(), 0);
    }

    #[test]
    fn test_exactly_one_id_per_callback_kind() {
        let registry = HandlerRegistry::new();
        let mapped = registry.map_options(
            GenerationContext::Root,
            vec![action_option("run"), query_option("search")],
        );

        assert!(mapped[0].action_id.is_some());
        assert!(mapped[0].on_query_id.is_none());
        assert!(mapped[1].action_id.is_none());
        assert!(mapped[1].on_query_id.is_some());
        assert_eq!(registry.handler_count(), 2);
    }

    #[tokio::test]
    async fn test_resolve_returns_original_callback() {
        let registry = HandlerRegistry::new();
        let generation = registry.begin_generation(GenerationContext::Root);

        let action = completing_action();
        let id = registry.register_action(generation, action.clone()).unwrap();

        let resolved = registry.resolve_action(&id).unwrap();
        assert!(Arc::ptr_eq(&resolved, &action));
        assert!(matches!(resolved().await, Ok(OptionOutcome::Complete(true))));
    }

    #[tokio::test]
    async fn test_resolve_query_returns_original_callback() {
        let registry = HandlerRegistry::new();
        let generation = registry.begin_generation(GenerationContext::Root);

        let query: QueryHandler = match query_option("search").callback {
            Some(OptionCallback::Query(query)) => query,
            other => panic!("Expected query callback, got {:?}", other),
        };
        let id = registry.register_query(generation, query.clone()).unwrap();

        let resolved = registry.resolve_query(&id).unwrap();
        assert!(Arc::ptr_eq(&resolved, &query));
        assert!(registry.resolve_action(&id).is_err());
        assert!(matches!(
            resolved("abc".to_string()).await,
            Ok(OptionOutcome::Options(options)) if options.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_mapped_query_id_resolves_to_callback() {
        let registry = HandlerRegistry::new();
        let option = PluginOption::new("echo").with_query(|text| async move {
            Ok(vec![PluginOption::new(text)])
        });
        let mapped = registry.map_options(GenerationContext::Root, vec![option]);
        let id = mapped[0].on_query_id.clone().unwrap();

        let resolved = registry.resolve_query(&id).unwrap();
        match resolved("hello".to_string()).await {
            Ok(OptionOutcome::Options(options)) => {
                let (echoed, _) = options.into_iter().next().unwrap().into_parts();
                assert_eq!(echoed.name, "hello");
            }
            other => panic!("Expected options, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_wrong_kind_is_unknown() {
        let registry = HandlerRegistry::new();
        let mapped = registry.map_options(GenerationContext::Root, vec![action_option("run")]);
        let id = mapped[0].action_id.clone().unwrap();

        assert!(registry.resolve_action(&id).is_ok());
        assert_eq!(
            registry.resolve_query(&id).err(),
            Some(RegistryError::UnknownHandler {
                kind: HandlerKind::Query,
                id: id.clone(),
            })
        );
        assert!(registry.resolve_action("missing").is_err());
    }

    #[test]
    fn test_ids_never_collide() {
        let registry = HandlerRegistry::with_retained_generations(100);
        let mut seen = HashSet::new();

        for _ in 0..50 {
            let mapped = registry.map_options(
                GenerationContext::Root,
                (0..20).map(|i| action_option(&i.to_string())).collect(),
            );
            for option in mapped {
                assert!(seen.insert(option.action_id.unwrap()));
            }
        }
        assert_eq!(registry.handler_count(), 1000);
    }

    #[test]
    fn test_superseded_generation_is_evicted() {
        let registry = HandlerRegistry::with_retained_generations(2);

        let first = registry.map_options(GenerationContext::Root, vec![action_option("1")]);
        let second = registry.map_options(GenerationContext::Root, vec![action_option("2")]);
        let first_id = first[0].action_id.clone().unwrap();
        let second_id = second[0].action_id.clone().unwrap();

        // Previous generation still resolves
        assert!(registry.contains(&first_id));

        let third = registry.map_options(GenerationContext::Root, vec![action_option("3")]);
        assert!(!registry.contains(&first_id));
        assert!(registry.contains(&second_id));
        assert!(registry.contains(third[0].action_id.as_ref().unwrap()));
        assert_eq!(registry.generation_count(), 2);
    }

    #[test]
    fn test_empty_result_set_still_supersedes() {
        let registry = HandlerRegistry::with_retained_generations(1);

        let first = registry.map_options(GenerationContext::Root, vec![action_option("1")]);
        registry.map_options(GenerationContext::Root, Vec::new());

        assert!(!registry.contains(first[0].action_id.as_ref().unwrap()));
        assert_eq!(registry.handler_count(), 0);
    }

    #[test]
    fn test_eviction_cascades_to_child_contexts() {
        let registry = HandlerRegistry::with_retained_generations(1);

        let root = registry.map_options(GenerationContext::Root, vec![query_option("files")]);
        let query_id = root[0].on_query_id.clone().unwrap();

        let child = registry.map_options(
            GenerationContext::Handler(query_id.clone()),
            vec![action_option("open")],
        );
        let child_id = child[0].action_id.clone().unwrap();
        assert_eq!(registry.handler_count(), 2);

        // A new root result set drops the query handler and everything under it
        registry.map_options(GenerationContext::Root, Vec::new());
        assert!(!registry.contains(&query_id));
        assert!(!registry.contains(&child_id));
        assert_eq!(registry.generation_count(), 1);
    }

    #[test]
    fn test_child_contexts_supersede_independently() {
        let registry = HandlerRegistry::with_retained_generations(1);

        let root = registry.map_options(
            GenerationContext::Root,
            vec![query_option("a"), query_option("b")],
        );
        let a = root[0].on_query_id.clone().unwrap();
        let b = root[1].on_query_id.clone().unwrap();

        let under_a =
            registry.map_options(GenerationContext::Handler(a.clone()), vec![action_option("x")]);
        let under_b =
            registry.map_options(GenerationContext::Handler(b.clone()), vec![action_option("y")]);

        // Re-querying inside `a` only replaces a's results
        registry.map_options(GenerationContext::Handler(a), vec![action_option("x2")]);
        assert!(!registry.contains(under_a[0].action_id.as_ref().unwrap()));
        assert!(registry.contains(under_b[0].action_id.as_ref().unwrap()));
        assert!(registry.contains(&b));
    }

    #[test]
    fn test_orphan_generations_are_bounded() {
        let registry = HandlerRegistry::with_retained_generations(2);

        for i in 0..5 {
            registry.map_options(
                GenerationContext::Handler("gone".to_string()),
                vec![action_option(&i.to_string())],
            );
        }
        assert_eq!(registry.generation_count(), 2);
        assert_eq!(registry.handler_count(), 2);
    }

    #[test]
    fn test_register_into_evicted_generation() {
        let registry = HandlerRegistry::with_retained_generations(1);
        let old = registry.begin_generation(GenerationContext::Root);
        registry.begin_generation(GenerationContext::Root);

        assert_eq!(
            registry.register_action(old, completing_action()),
            Err(RegistryError::GenerationEvicted(old.0))
        );
    }

    #[test]
    fn test_flush() {
        let registry = HandlerRegistry::new();
        registry.map_options(
            GenerationContext::Root,
            vec![action_option("a"), query_option("b")],
        );
        assert_eq!(registry.handler_count(), 2);

        registry.flush();
        assert_eq!(registry.handler_count(), 0);
        assert_eq!(registry.generation_count(), 0);
    }

    #[test]
    fn test_retained_is_at_least_one() {
        let registry = HandlerRegistry::with_retained_generations(0);
        let mapped = registry.map_options(GenerationContext::Root, vec![action_option("a")]);
        assert!(registry.contains(mapped[0].action_id.as_ref().unwrap()));
    }
}
