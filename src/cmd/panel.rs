//! Interactive reorder panel: `docs-reorder panel <collection>`.

use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};

use docs_reorder::errors::PanelError;
use docs_reorder::panel::{
    HttpPanelClient, Notification, PanelOptions, ReorderPanel, SaveOutcome, SortOrder,
};
use docs_reorder::plugin::translations::key;
use docs_reorder::settings::Settings;

pub struct PanelArgs {
    pub collection: String,
    pub url: String,
    pub api_key: Option<String>,
    pub locale: Option<String>,
    pub title_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Move,
    Save,
    Cancel,
    LoadMore,
    Sort(SortOrder),
    Quit,
}

pub async fn cmd_panel(settings: &Settings, args: PanelArgs) -> Result<()> {
    let title_field = args
        .title_field
        .clone()
        .or_else(|| {
            settings
                .host_config()
                .collection(&args.collection)
                .map(|c| c.title_field().to_string())
        })
        .unwrap_or_else(|| "id".to_string());

    let client = HttpPanelClient::new(&args.url, args.api_key.clone());
    let options = PanelOptions {
        locale: args.locale.clone(),
        title_field,
        ..PanelOptions::default()
    };

    let loading = spinner(format!("Loading {} from {}", args.collection, client.api_url()));
    let opened = ReorderPanel::open(client, &args.collection, options).await;
    loading.finish_and_clear();
    let mut panel = opened.with_context(|| format!("Failed to open '{}'", args.collection))?;

    let theme = ColorfulTheme::default();
    loop {
        render(&mut panel);

        let actions = actions(&panel);
        let labels: Vec<String> = actions.iter().map(|a| label(&panel, *a)).collect();
        let choice = Select::with_theme(&theme)
            .with_prompt(panel.translator().t(&key("sortItems")))
            .items(&labels)
            .default(0)
            .interact()?;

        match actions[choice] {
            Action::Move => {
                let len = panel.docs().len();
                let from: usize = Input::with_theme(&theme)
                    .with_prompt(format!("Move row (1-{})", len))
                    .interact_text()?;
                let to: usize = Input::with_theme(&theme)
                    .with_prompt(format!("To position (1-{})", len))
                    .interact_text()?;
                let result = match (from.checked_sub(1), to.checked_sub(1)) {
                    (Some(from), Some(to)) => panel.move_row(from, to),
                    _ => Err(PanelError::RowOutOfRange { index: 0, len }),
                };
                if let Err(e) = result {
                    println!("{}", style(e).red());
                }
            }
            Action::Save => {
                let saving = spinner(panel.translator().t(&key("save")));
                let outcome = panel.save().await;
                saving.finish_and_clear();
                if outcome? == SaveOutcome::NothingToSave {
                    println!("{}", style("No staged changes").dim());
                }
            }
            Action::Cancel => with_spinner(&mut panel, Action::Cancel).await?,
            Action::LoadMore => with_spinner(&mut panel, Action::LoadMore).await?,
            Action::Sort(order) => with_spinner(&mut panel, Action::Sort(order)).await?,
            Action::Quit => {
                if panel.has_unsaved_changes()
                    && !Confirm::with_theme(&theme)
                        .with_prompt("Discard unsaved changes?")
                        .default(false)
                        .interact()?
                {
                    continue;
                }
                return Ok(());
            }
        }
    }
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

async fn with_spinner(panel: &mut ReorderPanel<HttpPanelClient>, action: Action) -> Result<()> {
    let bar = spinner("Loading".to_string());
    let result = match action {
        Action::Cancel => panel.cancel().await,
        Action::LoadMore => panel.load_more().await.map(|_| ()),
        Action::Sort(order) => panel.set_sort_order(order).await,
        _ => Ok(()),
    };
    bar.finish_and_clear();
    result.map_err(Into::into)
}

fn actions(panel: &ReorderPanel<HttpPanelClient>) -> Vec<Action> {
    let controls = panel.controls();
    let mut actions = Vec::new();
    if !panel.docs().is_empty() {
        actions.push(Action::Move);
    }
    if controls.save {
        actions.push(Action::Save);
    }
    if controls.cancel {
        actions.push(Action::Cancel);
    }
    if controls.load_more {
        actions.push(Action::LoadMore);
    }
    actions.push(Action::Sort(panel.sort_order().toggled()));
    actions.push(Action::Quit);
    actions
}

fn label(panel: &ReorderPanel<HttpPanelClient>, action: Action) -> String {
    let t = panel.translator();
    match action {
        Action::Move => "Move a row".to_string(),
        Action::Save => t.t(&key("save")),
        Action::Cancel => t.t(&key("cancel")),
        Action::LoadMore => t.t(&key("loadMore")),
        Action::Sort(SortOrder::Asc) => t.t(&key("asc")),
        Action::Sort(SortOrder::Desc) => t.t(&key("desc")),
        Action::Quit => "Quit".to_string(),
    }
}

fn render(panel: &mut ReorderPanel<HttpPanelClient>) {
    println!();
    println!(
        "{} {}",
        style(panel.translator().t(&key("sortItems"))).bold(),
        style(format!("({})", panel.collection())).dim()
    );
    for (i, row) in panel.rows().iter().enumerate() {
        let order = row.order.map(|o| o.to_string()).unwrap_or_default();
        let pending = row
            .pending
            .map(|p| format!(" {}", style(format!("-> {}", p)).yellow()))
            .unwrap_or_default();
        println!(
            "{:>4}. {}{} - {} {}",
            i + 1,
            order,
            pending,
            row.title,
            style(&row.href).dim()
        );
    }
    println!("{}", style(panel.footer()).dim());

    for notification in panel.take_notifications() {
        match notification {
            Notification::Success(msg) => println!("{} {}", style("✓").green(), msg),
            Notification::Error(msg) => println!("{} {}", style("✗").red(), style(msg).red()),
        }
    }
}
