#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use {
    async_trait::async_trait,
    guildbot_common::{ChatMessage, ReplyOutbound},
    guildbot_config::DirectMessagePolicy,
    guildbot_modules::{
        ActivationGate, CommandRegistry, Dispatch, DispatchSettings, Error, Invocation,
        MemoryStore, Module, ModuleHub, Next, PermissionResolver, Services, StaticGuildDirectory,
        StoreActivationGate, StorePermissionResolver, handler_fn,
    },
};

const OWNER: &str = "bot-owner";

// ── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingOutbound {
    replies: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingOutbound {
    fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyOutbound for RecordingOutbound {
    async fn reply(&self, message: &ChatMessage, text: &str) -> guildbot_common::Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((message.author_id.clone(), text.to_string()));
        if self.fail {
            return Err(guildbot_common::Error::delivery(
                &message.channel_id,
                std::io::Error::other("channel gone"),
            ));
        }
        Ok(())
    }
}

/// Records every invocation of its commands.
#[derive(Default)]
struct Moderation {
    calls: Arc<Mutex<Vec<Invocation>>>,
    fail_handler: bool,
}

#[async_trait]
impl Module for Moderation {
    fn name(&self) -> &str {
        "moderation"
    }

    fn register_commands(&self, commands: &mut CommandRegistry) -> guildbot_modules::Result<()> {
        let calls = Arc::clone(&self.calls);
        let fail = self.fail_handler;
        commands.command(
            "ping",
            handler_fn(move |inv| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.lock().unwrap().push(inv);
                    if fail {
                        anyhow::bail!("handler blew up");
                    }
                    Ok(())
                }
            }),
        )?;

        let calls = Arc::clone(&self.calls);
        commands.privileged(
            "ban",
            handler_fn(move |inv| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.lock().unwrap().push(inv);
                    Ok(())
                }
            }),
        )?;
        Ok(())
    }
}

/// Last link in the chain; counts how often the continuation reached it.
struct Tail {
    seen: Arc<AtomicUsize>,
}

#[async_trait]
impl Module for Tail {
    fn name(&self) -> &str {
        "tail"
    }

    async fn handle(
        &self,
        _message: &ChatMessage,
        _next: Next<'_>,
    ) -> guildbot_modules::Result<Dispatch> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(Dispatch::handled("tail"))
    }
}

struct FailingGate;

#[async_trait]
impl ActivationGate for FailingGate {
    async fn disabled_modules(&self, _guild_id: &str) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("store offline")
    }
}

struct FailingResolver;

#[async_trait]
impl PermissionResolver for FailingResolver {
    async fn privileged_role_or_owner(&self, _guild_id: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("guild cache unavailable")
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

struct Harness {
    hub: ModuleHub,
    calls: Arc<Mutex<Vec<Invocation>>>,
    tail: Arc<AtomicUsize>,
    outbound: Arc<RecordingOutbound>,
    gate: Arc<StoreActivationGate>,
    resolver: Arc<StorePermissionResolver>,
}

impl Harness {
    fn handler_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn tail_calls(&self) -> usize {
        self.tail.load(Ordering::SeqCst)
    }
}

struct HarnessBuilder {
    settings: DispatchSettings,
    moderation: Moderation,
    outbound: RecordingOutbound,
    gate: Option<Arc<dyn ActivationGate>>,
    permissions: Option<Arc<dyn PermissionResolver>>,
}

impl HarnessBuilder {
    fn new() -> Self {
        Self {
            settings: DispatchSettings::default().with_owner(OWNER),
            moderation: Moderation::default(),
            outbound: RecordingOutbound::default(),
            gate: None,
            permissions: None,
        }
    }

    async fn build(self) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(StaticGuildDirectory::default());
        directory.insert("G1", "guild-owner");

        let gate = Arc::new(StoreActivationGate::new(store.clone()));
        let resolver = Arc::new(StorePermissionResolver::new(store, directory));
        let outbound = Arc::new(self.outbound);
        let default_gate: Arc<dyn ActivationGate> = gate.clone();
        let default_permissions: Arc<dyn PermissionResolver> = resolver.clone();
        let services = Services {
            gate: self.gate.unwrap_or(default_gate),
            permissions: self.permissions.unwrap_or(default_permissions),
            outbound: outbound.clone(),
        };

        let calls = Arc::clone(&self.moderation.calls);
        let tail = Arc::new(AtomicUsize::new(0));
        let hub = ModuleHub::builder(self.settings, services)
            .module(self.moderation)
            .module(Tail { seen: tail.clone() })
            .build()
            .unwrap();
        hub.initialize().await.unwrap();

        Harness {
            hub,
            calls,
            tail,
            outbound,
            gate,
            resolver,
        }
    }
}

async fn harness() -> Harness {
    HarnessBuilder::new().build().await
}

fn guild_message(author: &str, content: &str) -> ChatMessage {
    ChatMessage::new(author, content)
        .in_guild("G1")
        .in_channel("C1")
}

// ── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_command_consumes_message() {
    let h = harness().await;

    let outcome = h.hub.dispatch(&guild_message("u1", "_ping")).await.unwrap();

    assert_eq!(outcome, Dispatch::Executed {
        module: "moderation".into(),
        command: "ping".into(),
    });
    assert_eq!(h.handler_calls(), 1);
    assert_eq!(h.tail_calls(), 0);
}

#[tokio::test]
async fn scenario_b_arguments_do_not_affect_matching() {
    let h = harness().await;
    let msg = guild_message("u1", "_ping extra args");

    h.hub.dispatch(&msg).await.unwrap();

    let calls = h.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].message, msg);
    assert_eq!(calls[0].command, "ping");
    assert_eq!(calls[0].args, vec!["extra", "args"]);
    assert_eq!(calls[0].guild_id(), "G1");
    assert_eq!(h.tail_calls(), 0);
}

#[tokio::test]
async fn scenario_c_disabled_module_passes_message_on() {
    let h = harness().await;
    h.gate.set_enabled("G1", "moderation", false).await.unwrap();

    let outcome = h.hub.dispatch(&guild_message("u1", "_ping")).await.unwrap();

    assert_eq!(outcome, Dispatch::handled("tail"));
    assert_eq!(h.handler_calls(), 0);
    assert_eq!(h.tail_calls(), 1);

    // Other guilds are unaffected.
    let other = ChatMessage::new("u1", "_ping").in_guild("G2");
    h.hub.dispatch(&other).await.unwrap();
    assert_eq!(h.handler_calls(), 1);
}

#[tokio::test]
async fn scenario_d_denied_privileged_command_ends_dispatch() {
    let h = harness().await;
    h.resolver.set_privileged_role("G1", "R1").await.unwrap();

    let msg = guild_message("u1", "_ban someone").with_roles(["R0"]);
    let outcome = h.hub.dispatch(&msg).await.unwrap();

    assert_eq!(outcome, Dispatch::Denied {
        module: "moderation".into(),
        command: "ban".into(),
        required: Some("R1".into()),
    });
    let replies = h.outbound.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, "u1");
    assert!(replies[0].1.contains("R1"), "{}", replies[0].1);
    assert_eq!(h.handler_calls(), 0);
    assert_eq!(h.tail_calls(), 0);
}

#[tokio::test]
async fn scenario_e_direct_message_stops_at_first_unit() {
    let h = harness().await;

    let outcome = h.hub.dispatch(&ChatMessage::new("u1", "_ping")).await.unwrap();

    assert_eq!(outcome, Dispatch::Stopped {
        module: "moderation".into(),
    });
    assert_eq!(h.handler_calls(), 0);
    assert_eq!(h.tail_calls(), 0);
}

// ── Chain properties ────────────────────────────────────────────────────────

#[tokio::test]
async fn forwarded_direct_message_skips_module_logic() {
    let mut builder = HarnessBuilder::new();
    builder.settings = builder
        .settings
        .with_direct_messages(DirectMessagePolicy::Forward);
    let h = builder.build().await;

    // Every unit forwards, including the one wrapping `tail`.
    let outcome = h.hub.dispatch(&ChatMessage::new("u1", "_ping")).await.unwrap();

    assert_eq!(outcome, Dispatch::Exhausted);
    assert_eq!(h.handler_calls(), 0);
    assert_eq!(h.tail_calls(), 0);
}

#[tokio::test]
async fn non_command_text_reaches_next_module_once() {
    let h = harness().await;

    for content in ["hello there", "_", "_ ping", "_unknown", "_Ping", "!ping", ""] {
        h.hub.dispatch(&guild_message("u1", content)).await.unwrap();
    }

    assert_eq!(h.handler_calls(), 0);
    assert_eq!(h.tail_calls(), 7);
}

#[tokio::test]
async fn custom_prefix_is_honoured() {
    let mut builder = HarnessBuilder::new();
    builder.settings = builder.settings.with_prefix("!!");
    let h = builder.build().await;

    h.hub.dispatch(&guild_message("u1", "_ping")).await.unwrap();
    assert_eq!(h.tail_calls(), 1);

    h.hub.dispatch(&guild_message("u1", "!!ping")).await.unwrap();
    assert_eq!(h.handler_calls(), 1);
}

#[tokio::test]
async fn bot_owner_may_run_privileged_commands() {
    let h = harness().await;
    h.resolver.set_privileged_role("G1", "R1").await.unwrap();

    let outcome = h.hub.dispatch(&guild_message(OWNER, "_ban x")).await.unwrap();

    assert!(matches!(outcome, Dispatch::Executed { .. }));
    assert_eq!(h.handler_calls(), 1);
    assert!(h.outbound.replies().is_empty());
}

#[tokio::test]
async fn role_holder_may_run_privileged_commands() {
    let h = harness().await;
    h.resolver.set_privileged_role("G1", "R1").await.unwrap();

    let msg = guild_message("u1", "_ban x").with_roles(["R0", "R1"]);
    h.hub.dispatch(&msg).await.unwrap();

    assert_eq!(h.handler_calls(), 1);
    assert_eq!(h.tail_calls(), 0);
}

#[tokio::test]
async fn guild_owner_is_authorized_without_role_binding() {
    let h = harness().await;

    h.hub.dispatch(&guild_message("guild-owner", "_ban x")).await.unwrap();
    assert_eq!(h.handler_calls(), 1);

    // Once a role is bound the owner fallback no longer applies.
    h.resolver.set_privileged_role("G1", "R1").await.unwrap();
    let outcome = h.hub.dispatch(&guild_message("guild-owner", "_ban x")).await.unwrap();
    assert!(matches!(outcome, Dispatch::Denied { .. }));
    assert_eq!(h.handler_calls(), 1);
}

#[tokio::test]
async fn unknown_guild_only_admits_bot_owner() {
    let h = harness().await;

    let msg = ChatMessage::new("u1", "_ban x").in_guild("G9");
    let outcome = h.hub.dispatch(&msg).await.unwrap();
    assert!(matches!(outcome, Dispatch::Denied { required: None, .. }));
    assert_eq!(h.outbound.replies().len(), 1);

    let msg = ChatMessage::new(OWNER, "_ban x").in_guild("G9");
    h.hub.dispatch(&msg).await.unwrap();
    assert_eq!(h.handler_calls(), 1);
}

#[tokio::test]
async fn failed_denial_reply_still_ends_dispatch() {
    let mut builder = HarnessBuilder::new();
    builder.outbound.fail = true;
    let h = builder.build().await;
    h.resolver.set_privileged_role("G1", "R1").await.unwrap();

    let outcome = h.hub.dispatch(&guild_message("u1", "_ban x")).await.unwrap();

    assert!(matches!(outcome, Dispatch::Denied { .. }));
    assert_eq!(h.outbound.replies().len(), 1);
    assert_eq!(h.tail_calls(), 0);
}

#[tokio::test]
async fn failing_handler_still_consumes_message() {
    let mut builder = HarnessBuilder::new();
    builder.moderation.fail_handler = true;
    let h = builder.build().await;

    let outcome = h.hub.dispatch(&guild_message("u1", "_ping")).await.unwrap();

    assert!(matches!(outcome, Dispatch::Executed { .. }));
    assert_eq!(h.handler_calls(), 1);
    assert_eq!(h.tail_calls(), 0);
}

#[tokio::test]
async fn gate_failure_fails_dispatch() {
    let mut builder = HarnessBuilder::new();
    builder.gate = Some(Arc::new(FailingGate));
    let h = builder.build().await;

    let err = h.hub.dispatch(&guild_message("u1", "_ping")).await.unwrap_err();

    assert!(
        matches!(err, Error::Collaborator { ref module, context, .. }
            if module == "moderation" && context == "activation gate"),
        "{err}"
    );
    assert_eq!(h.handler_calls(), 0);
    assert_eq!(h.tail_calls(), 0);
}

#[tokio::test]
async fn resolver_failure_fails_privileged_dispatch() {
    let mut builder = HarnessBuilder::new();
    builder.permissions = Some(Arc::new(FailingResolver));
    let h = builder.build().await;

    let err = h
        .hub
        .dispatch(&guild_message("u1", "_ban x"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Collaborator { ref module, context, .. }
            if module == "moderation" && context == "permission resolver"),
        "{err}"
    );
    assert_eq!(h.handler_calls(), 0);
    assert_eq!(h.tail_calls(), 0);
    assert!(h.outbound.replies().is_empty());

    // Public commands never consult the resolver.
    h.hub.dispatch(&guild_message("u1", "_ping")).await.unwrap();
    assert_eq!(h.handler_calls(), 1);
}

#[tokio::test]
async fn first_module_with_matching_command_wins() {
    let calls_first = Arc::new(Mutex::new(Vec::new()));
    let calls_second = Arc::new(Mutex::new(Vec::new()));

    struct Dup {
        name: &'static str,
        calls: Arc<Mutex<Vec<Invocation>>>,
    }

    #[async_trait]
    impl Module for Dup {
        fn name(&self) -> &str {
            self.name
        }

        fn register_commands(
            &self,
            commands: &mut CommandRegistry,
        ) -> guildbot_modules::Result<()> {
            let calls = Arc::clone(&self.calls);
            commands.command(
                "ping",
                handler_fn(move |inv| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.lock().unwrap().push(inv);
                        Ok(())
                    }
                }),
            )?;
            Ok(())
        }
    }

    let store = Arc::new(MemoryStore::new());
    let gate = Arc::new(StoreActivationGate::new(store.clone()));
    let services = Services {
        gate: gate.clone(),
        permissions: Arc::new(StorePermissionResolver::new(
            store,
            Arc::new(StaticGuildDirectory::default()),
        )),
        outbound: Arc::new(RecordingOutbound::default()),
    };
    let hub = ModuleHub::builder(DispatchSettings::default(), services)
        .module(Dup {
            name: "first",
            calls: calls_first.clone(),
        })
        .module(Dup {
            name: "second",
            calls: calls_second.clone(),
        })
        .build()
        .unwrap();
    hub.initialize().await.unwrap();

    let msg = guild_message("u1", "_ping");
    let outcome = hub.dispatch(&msg).await.unwrap();
    assert_eq!(outcome.module(), Some("first"));
    assert_eq!(calls_first.lock().unwrap().len(), 1);
    assert!(calls_second.lock().unwrap().is_empty());

    // Disabling the first hands the command to the second.
    gate.set_enabled("G1", "first", false).await.unwrap();
    let outcome = hub.dispatch(&msg).await.unwrap();
    assert_eq!(outcome.module(), Some("second"));
    assert_eq!(calls_second.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn handle_override_can_consume_or_forward() {
    struct Filter {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Module for Filter {
        fn name(&self) -> &str {
            "filter"
        }

        async fn handle(
            &self,
            message: &ChatMessage,
            next: Next<'_>,
        ) -> guildbot_modules::Result<Dispatch> {
            assert_eq!(next.next_module(), Some("tail"));
            assert_eq!(next.remaining(), 1);
            self.seen.fetch_add(1, Ordering::SeqCst);
            if message.content.contains("spam") {
                return Ok(Dispatch::handled(self.name()));
            }
            next.run().await
        }
    }

    let store = Arc::new(MemoryStore::new());
    let services = Services {
        gate: Arc::new(StoreActivationGate::new(store.clone())),
        permissions: Arc::new(StorePermissionResolver::new(
            store,
            Arc::new(StaticGuildDirectory::default()),
        )),
        outbound: Arc::new(RecordingOutbound::default()),
    };
    let filter_seen = Arc::new(AtomicUsize::new(0));
    let tail_seen = Arc::new(AtomicUsize::new(0));
    let hub = ModuleHub::builder(DispatchSettings::default(), services)
        .module(Filter {
            seen: filter_seen.clone(),
        })
        .module(Tail {
            seen: tail_seen.clone(),
        })
        .build()
        .unwrap();
    hub.initialize().await.unwrap();

    let outcome = hub.dispatch(&guild_message("u1", "buy spam")).await.unwrap();
    assert_eq!(outcome, Dispatch::handled("filter"));
    assert_eq!(tail_seen.load(Ordering::SeqCst), 0);

    let outcome = hub.dispatch(&guild_message("u1", "hello")).await.unwrap();
    assert_eq!(outcome, Dispatch::handled("tail"));
    assert_eq!(filter_seen.load(Ordering::SeqCst), 2);
    assert_eq!(tail_seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_dispatches_are_independent() {
    let h = harness().await;
    h.gate.set_enabled("G2", "moderation", false).await.unwrap();

    let in_g1 = guild_message("u1", "_ping");
    let in_g2 = ChatMessage::new("u2", "_ping").in_guild("G2");
    let (a, b) = futures::join!(h.hub.dispatch(&in_g1), h.hub.dispatch(&in_g2));

    assert!(matches!(a.unwrap(), Dispatch::Executed { .. }));
    assert_eq!(b.unwrap(), Dispatch::handled("tail"));
    assert_eq!(h.handler_calls(), 1);
    assert_eq!(h.tail_calls(), 1);
}
