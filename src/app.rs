use std::collections::VecDeque;

use anyhow::Result;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use frstack_functions::config::AppConfig;
use frstack_functions::host::HostHarness;
use frstack_functions::{Channel, FunctionError, FunctionRegistry, SampleFunctions};

use crate::msg::Msg;

pub struct App {
    pub config: AppConfig,
    pub registry: FunctionRegistry,
    pub harness: HostHarness,
    pub should_quit: bool,
    pub event_tx: mpsc::UnboundedSender<Msg>,
    pub output: VecDeque<String>,
    in_flight: usize,
}

impl App {
    pub fn new(config: AppConfig, event_tx: mpsc::UnboundedSender<Msg>) -> Result<Self> {
        let harness = HostHarness::from_config(&config);
        let mut registry = FunctionRegistry::new(SampleFunctions);
        registry.init(harness.context())?;

        let mut app = Self {
            config,
            registry,
            harness,
            should_quit: false,
            event_tx,
            output: VecDeque::new(),
            in_flight: 0,
        };
        app.push_output(app.summary_notification());
        Ok(app)
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Line(line) => self.handle_command(line),
            Msg::FunctionDone {
                index,
                channel,
                result,
            } => self.handle_function_done(index, channel, result),
            Msg::Tick => self.registry.poll(),
            Msg::Quit => self.should_quit = true,
        }
        Ok(())
    }

    pub fn drain_output(&mut self) -> Vec<String> {
        self.output.drain(..).collect()
    }

    pub fn shutdown(&mut self) {
        let released = self.registry.subscription_count();
        self.registry.cleanup();
        self.push_output(format!("cleanup: released {released} subscriptions"));
    }

    fn handle_command(&mut self, line: String) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let notifications = match verb {
            "help" | "?" => help_lines(),
            "list" | "ls" => self.list_notifications(),
            "status" => self.status_notifications(),
            "menu" | "hotkey" | "rest" => match verb.parse::<Channel>() {
                Ok(channel) => self.invoke(channel, rest),
                Err(err) => vec![err.to_string()],
            },
            "slice" => self.handle_slice(rest),
            "prop" => self.handle_property(rest),
            "reload" => self.reload(),
            "quit" | "exit" | "q" => {
                self.should_quit = true;
                Vec::new()
            }
            _ => vec![format!("unknown command: {verb} (try help)")],
        };

        for notification in notifications {
            self.push_output(notification);
        }
    }

    fn invoke(&mut self, channel: Channel, target: &str) -> Vec<String> {
        let target = unquote(target);
        if target.is_empty() {
            return vec![format!(
                "usage: {} <index|label>",
                channel.label().to_lowercase()
            )];
        }

        let index = target
            .parse::<usize>()
            .ok()
            .or_else(|| self.registry.find(&target));
        let Some(index) = index else {
            return vec![format!("function not found: {target}")];
        };

        let pending = self
            .registry
            .dispatch(index, vec![json!(channel.label())]);
        let tx = self.event_tx.clone();
        let spawned = self.registry.spawn_background(async move {
            let result = pending.await;
            let _ = tx.send(Msg::FunctionDone {
                index,
                channel,
                result,
            });
        });

        if spawned.is_none() {
            return vec!["no async runtime available to run functions".to_string()];
        }

        self.in_flight += 1;
        Vec::new()
    }

    fn handle_function_done(
        &mut self,
        index: usize,
        channel: Channel,
        result: Result<Value, FunctionError>,
    ) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let label = self
            .registry
            .item(index)
            .map(|item| item.label)
            .unwrap_or_else(|| format!("#{index}"));

        let line = match result {
            Ok(value) => format!("[{channel}] {label}: {}", render_result(channel, &value)),
            Err(err) => format!("[{channel}] {label} failed: {err}"),
        };
        self.push_output(line);
    }

    fn handle_slice(&mut self, action: &str) -> Vec<String> {
        let Some(radio) = self.harness.radio.as_ref() else {
            return vec!["no radio connected".to_string()];
        };

        match action {
            "add" => {
                let slice = radio.add_slice();
                vec![format!("slice {} added", slice.letter)]
            }
            "remove" | "rm" => match radio.remove_slice() {
                Some(slice) => vec![format!("slice {} removed", slice.letter)],
                None => vec!["no slices open".to_string()],
            },
            _ => vec!["usage: slice add|remove".to_string()],
        }
    }

    fn handle_property(&mut self, name: &str) -> Vec<String> {
        let Some(radio) = self.harness.radio.as_ref() else {
            return vec!["no radio connected".to_string()];
        };

        let name = unquote(name);
        if name.is_empty() {
            return vec!["usage: prop <name>".to_string()];
        }

        let delivered = radio.property_changed(name.clone());
        vec![format!("property {name} changed ({delivered} handlers)")]
    }

    fn reload(&mut self) -> Vec<String> {
        self.registry.cleanup();
        match self.registry.init(self.harness.context()) {
            Ok(()) => vec!["functions: reloaded".to_string(), self.summary_notification()],
            Err(err) => vec![format!("functions: reload failed: {err}")],
        }
    }

    fn summary_notification(&self) -> String {
        let visible = self.registry.visible_items().len();
        let connected = if self.harness.radio.is_some() {
            "radio connected"
        } else {
            "no radio"
        };
        format!(
            "functions: {} registered, {visible} visible ({connected})",
            self.registry.len()
        )
    }

    fn list_notifications(&self) -> Vec<String> {
        let items = self.registry.items();
        if items.is_empty() {
            return vec!["functions: none registered".to_string()];
        }

        items
            .into_iter()
            .map(|item| {
                let mut flags = Vec::new();
                if !item.enabled {
                    flags.push("disabled");
                }
                if item.hidden {
                    flags.push("hidden");
                }
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                };
                let mnemonic = item
                    .mnemonic
                    .map(|ch| format!(" (alt+{ch})"))
                    .unwrap_or_default();

                format!("{:>2}  {}{mnemonic}{flags}", item.index, item.label)
            })
            .collect()
    }

    fn status_notifications(&self) -> Vec<String> {
        let mut notes = vec![
            format!("registry: {:?}", self.registry.state()),
            format!("subscriptions: {}", self.registry.subscription_count()),
            format!(
                "polls: {} every {} ms",
                self.registry.ticks(),
                self.config.general.poll_interval_ms
            ),
            format!("in flight: {}", self.in_flight),
            format!("spe window: {}", on_off(self.harness.rest.spe_window_open())),
        ];

        if let Some(radio) = self.harness.radio.as_ref() {
            let info = radio.info();
            notes.push(format!(
                "radio: {} \"{}\" {} mox {}",
                info.profile.model,
                info.profile.nickname,
                info.profile.callsign,
                on_off(info.mox)
            ));
        }

        if let Some(activity) = self.registry.activity() {
            notes.push(format!(
                "activity: {} events, {} slices, last property {}",
                activity.events,
                activity.slices,
                activity.last_property.as_deref().unwrap_or("-")
            ));
        }

        notes
    }

    fn push_output(&mut self, message: String) {
        self.output.push_back(message);
    }
}

fn help_lines() -> Vec<String> {
    [
        "built-ins:",
        "  help (alias: ?)",
        "  list (alias: ls)",
        "  status",
        "  menu <index|label>",
        "  hotkey <index|label>",
        "  rest <index|label>",
        "    examples: menu 0 | hotkey m | rest \"Rest Radio Info\"",
        "  slice add|remove",
        "  prop <name>",
        "  reload",
        "  quit (alias: q)",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Menu and hotkey results land in a message box; REST callers see JSON.
fn render_result(channel: Channel, value: &Value) -> String {
    match (channel, value) {
        (Channel::Rest, value) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        (_, Value::String(text)) if text.is_empty() => "(done)".to_string(),
        (_, Value::String(text)) => text.clone(),
        (_, value) => value.to_string(),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

/// Strips one pair of matching `"` or `'` quotes around a console argument.
fn unquote(raw: &str) -> String {
    let input = raw.trim();
    ['"', '\'']
        .into_iter()
        .find_map(|quote| input.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(input)
        .trim()
        .to_string()
}
