//! Before/after hook pipeline around requirement execution.
//!
//! Hooks are registered on an explicit [`HookRegistry`] value at startup and
//! the registry is handed to the conversation loop by reference; there is no
//! global state and no registration once a conversation is running. Each
//! registration carries an optional set of requirement kinds it applies to
//! (`None` = all). Execution order is registration order.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AccordConfig;
use crate::error::AccordResult;
use crate::schema::{Requirement, RequirementKind, RequirementResult};

/// Context passed to every hook invocation.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub session_id: String,
    pub config: Arc<AccordConfig>,
}

/// Hook that runs before a requirement executes.
///
/// Returning `Ok(Some(result))` vetoes execution: the returned result becomes
/// the requirement's outcome, remaining before-hooks and the primitive are
/// skipped, and after-hooks still run over it. Returning an error fails the
/// requirement's resolution with an execution error.
#[async_trait]
pub trait BeforeHook: Send + Sync {
    fn name(&self) -> &str;

    async fn check(
        &self,
        ctx: &HookContext,
        requirement: &Requirement,
    ) -> AccordResult<Option<RequirementResult>>;
}

/// Hook that runs after a requirement has produced a result.
///
/// Receives the accumulated result and may replace it. An error aborts this
/// requirement's after-phase only, never the whole turn.
#[async_trait]
pub trait AfterHook: Send + Sync {
    fn name(&self) -> &str;

    async fn review(
        &self,
        ctx: &HookContext,
        requirement: &Requirement,
        result: RequirementResult,
    ) -> AccordResult<RequirementResult>;
}

type KindFilter = Option<HashSet<RequirementKind>>;

struct Registration<H: ?Sized> {
    kinds: KindFilter,
    hook: Arc<H>,
}

impl<H: ?Sized> Registration<H> {
    fn applies_to(&self, kind: RequirementKind) -> bool {
        match &self.kinds {
            None => true,
            Some(kinds) => kinds.contains(&kind),
        }
    }
}

/// Append-only registry of before/after hooks, fixed once the loop starts.
#[derive(Default)]
pub struct HookRegistry {
    before: Vec<Registration<dyn BeforeHook>>,
    after: Vec<Registration<dyn AfterHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Register a before-hook for the given kinds (`None` = all).
    pub fn before(
        &mut self,
        kinds: Option<&[RequirementKind]>,
        hook: Arc<dyn BeforeHook>,
    ) -> &mut Self {
        self.before.push(Registration {
            kinds: kinds.map(|k| k.iter().copied().collect()),
            hook,
        });
        self
    }

    /// Register an after-hook for the given kinds (`None` = all).
    pub fn after(
        &mut self,
        kinds: Option<&[RequirementKind]>,
        hook: Arc<dyn AfterHook>,
    ) -> &mut Self {
        self.after.push(Registration {
            kinds: kinds.map(|k| k.iter().copied().collect()),
            hook,
        });
        self
    }

    pub fn before_count(&self) -> usize {
        self.before.len()
    }

    pub fn after_count(&self) -> usize {
        self.after.len()
    }

    /// Run matching before-hooks in registration order. The first hook that
    /// returns a concrete result short-circuits; later before-hooks and the
    /// execution step are skipped. A hook error propagates immediately.
    pub async fn run_before(
        &self,
        ctx: &HookContext,
        requirement: &Requirement,
    ) -> AccordResult<Option<RequirementResult>> {
        for registration in &self.before {
            if !registration.applies_to(requirement.kind()) {
                continue;
            }
            if let Some(result) = registration.hook.check(ctx, requirement).await? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Run matching after-hooks in registration order, each receiving (and
    /// able to replace) the accumulated result.
    pub async fn run_after(
        &self,
        ctx: &HookContext,
        requirement: &Requirement,
        mut result: RequirementResult,
    ) -> AccordResult<RequirementResult> {
        for registration in &self.after {
            if !registration.applies_to(requirement.kind()) {
                continue;
            }
            result = registration.hook.review(ctx, requirement, result).await?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccordError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn test_ctx() -> HookContext {
        HookContext {
            session_id: "s1".into(),
            config: Arc::new(AccordConfig::default()),
        }
    }

    struct PassHook {
        name: String,
        order: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl BeforeHook for PassHook {
        fn name(&self) -> &str {
            &self.name
        }

        async fn check(
            &self,
            _ctx: &HookContext,
            _requirement: &Requirement,
        ) -> AccordResult<Option<RequirementResult>> {
            self.order.lock().unwrap().push(self.name.clone());
            Ok(None)
        }
    }

    struct BlockCommandsHook;

    #[async_trait]
    impl BeforeHook for BlockCommandsHook {
        fn name(&self) -> &str {
            "block_commands"
        }

        async fn check(
            &self,
            _ctx: &HookContext,
            requirement: &Requirement,
        ) -> AccordResult<Option<RequirementResult>> {
            Ok(Some(RequirementResult::denied(
                requirement,
                "blocked by policy hook",
            )))
        }
    }

    struct CountingAfterHook {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AfterHook for CountingAfterHook {
        fn name(&self) -> &str {
            "counting_after"
        }

        async fn review(
            &self,
            _ctx: &HookContext,
            _requirement: &Requirement,
            result: RequirementResult,
        ) -> AccordResult<RequirementResult> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(result)
        }
    }

    struct AnnotatingAfterHook;

    #[async_trait]
    impl AfterHook for AnnotatingAfterHook {
        fn name(&self) -> &str {
            "annotate"
        }

        async fn review(
            &self,
            _ctx: &HookContext,
            _requirement: &Requirement,
            result: RequirementResult,
        ) -> AccordResult<RequirementResult> {
            Ok(result.with_error("seen by validator"))
        }
    }

    #[tokio::test]
    async fn before_hooks_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.before(
            None,
            Arc::new(PassHook {
                name: "first".into(),
                order: order.clone(),
            }),
        );
        registry.before(
            None,
            Arc::new(PassHook {
                name: "second".into(),
                order: order.clone(),
            }),
        );

        let req = Requirement::command("ls", "list");
        let result = registry.run_before(&test_ctx(), &req).await.unwrap();
        assert!(result.is_none());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn before_veto_short_circuits() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.before(None, Arc::new(BlockCommandsHook));
        registry.before(
            None,
            Arc::new(PassHook {
                name: "never".into(),
                order: order.clone(),
            }),
        );

        let req = Requirement::command("rm -rf /", "cleanup");
        let result = registry.run_before(&test_ctx(), &req).await.unwrap();
        let result = result.expect("veto result");
        assert!(!result.accepted());
        assert_eq!(result.error(), Some("blocked by policy hook"));
        // The later hook never ran.
        assert!(order.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn kind_filter_skips_non_matching() {
        let mut registry = HookRegistry::new();
        registry.before(
            Some(&[RequirementKind::Command]),
            Arc::new(BlockCommandsHook),
        );

        let file_req = Requirement::file_read("/tmp/a", "read");
        let result = registry.run_before(&test_ctx(), &file_req).await.unwrap();
        assert!(result.is_none());

        let cmd_req = Requirement::command("ls", "list");
        let result = registry.run_before(&test_ctx(), &cmd_req).await.unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn after_hooks_chain_and_transform() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut registry = HookRegistry::new();
        registry.after(None, Arc::new(CountingAfterHook { seen: seen.clone() }));
        registry.after(None, Arc::new(AnnotatingAfterHook));

        let req = Requirement::command("ls", "list");
        let result = RequirementResult::denied(&req, "vetoed");
        let result = registry.run_after(&test_ctx(), &req, result).await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(result.error(), Some("seen by validator"));
    }

    #[tokio::test]
    async fn before_hook_error_propagates() {
        struct FailingHook;

        #[async_trait]
        impl BeforeHook for FailingHook {
            fn name(&self) -> &str {
                "failing"
            }

            async fn check(
                &self,
                _ctx: &HookContext,
                _requirement: &Requirement,
            ) -> AccordResult<Option<RequirementResult>> {
                Err(AccordError::execution("hook panicked"))
            }
        }

        let mut registry = HookRegistry::new();
        registry.before(None, Arc::new(FailingHook));

        let req = Requirement::command("ls", "list");
        let result = registry.run_before(&test_ctx(), &req).await;
        assert!(matches!(result, Err(AccordError::Execution { .. })));
    }

    #[tokio::test]
    async fn empty_registry_is_passthrough() {
        let registry = HookRegistry::new();
        let req = Requirement::file_read("/tmp/a", "read");
        assert!(registry
            .run_before(&test_ctx(), &req)
            .await
            .unwrap()
            .is_none());

        let result = RequirementResult::failed(&req, "io error");
        let back = registry
            .run_after(&test_ctx(), &req, result.clone())
            .await
            .unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn registration_counts() {
        let mut registry = HookRegistry::new();
        assert_eq!(registry.before_count(), 0);
        registry.before(None, Arc::new(BlockCommandsHook));
        registry.after(None, Arc::new(AnnotatingAfterHook));
        assert_eq!(registry.before_count(), 1);
        assert_eq!(registry.after_count(), 1);
    }
}
