//! Implements InputPort. Inquire-based interactive menu over the membership service.

use crate::adapters::export::write_export;
use crate::domain::{DEFAULT_GROUP_KIND, DomainError, Group, SUGGESTED_GROUP_KINDS};
use crate::ports::InputPort;
use crate::usecases::{DirectoryProjection, MembershipService};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::error::InquireError;
use inquire::{Select, Text};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Other group types are typed in free form.
const OTHER_KIND: &str = "Other…";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Create,
    Join,
    Lookup,
    Rename,
    List,
    Watch,
    Export,
    Quit,
}

impl MenuAction {
    const ALL: [MenuAction; 8] = [
        MenuAction::Create,
        MenuAction::Join,
        MenuAction::Lookup,
        MenuAction::Rename,
        MenuAction::List,
        MenuAction::Watch,
        MenuAction::Export,
        MenuAction::Quit,
    ];
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuAction::Create => "Create group",
            MenuAction::Join => "Join with code",
            MenuAction::Lookup => "Look up code",
            MenuAction::Rename => "Rename group",
            MenuAction::List => "List groups",
            MenuAction::Watch => "Watch directory (Ctrl-C to stop)",
            MenuAction::Export => "Export CSV",
            MenuAction::Quit => "Quit",
        };
        f.write_str(label)
    }
}

/// One line per group, as shown in lists and pickers.
fn group_row(g: &Group) -> String {
    format!(
        "{:<28} {:<10} members: {:<5} code: {}",
        g.name, g.kind, g.member_count, g.code
    )
}

/// `Ok(None)` when the user cancelled the prompt (Esc or Ctrl-C).
fn prompt<T>(result: Result<T, InquireError>) -> Result<Option<T>, DomainError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(DomainError::Ui(e.to_string())),
    }
}

/// Run `fut` behind a spinner with `message`.
async fn with_spinner<T>(message: &str, fut: impl Future<Output = T>) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    spinner.finish_and_clear();
    out
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    service: Arc<MembershipService>,
    export_dir: PathBuf,
}

impl TuiInputPort {
    pub fn new(service: Arc<MembershipService>, export_dir: PathBuf) -> Self {
        Self {
            service,
            export_dir,
        }
    }

    async fn create(&self) -> Result<(), DomainError> {
        let Some(name) = prompt(Text::new("Group name:").prompt())? else {
            return Ok(());
        };
        let mut kinds: Vec<&str> = SUGGESTED_GROUP_KINDS.to_vec();
        kinds.push(OTHER_KIND);
        let Some(kind) = prompt(Select::new("Group type:", kinds).prompt())? else {
            return Ok(());
        };
        let kind = if kind == OTHER_KIND {
            let Some(custom) = prompt(
                Text::new("Type label:")
                    .with_default(DEFAULT_GROUP_KIND)
                    .prompt(),
            )?
            else {
                return Ok(());
            };
            custom
        } else {
            kind.to_string()
        };

        let group = with_spinner("Creating group…", self.service.create_group(&name, &kind)).await?;
        println!("Created {}", group.display_label());
        println!("Share code {} or link {}", group.code, self.service.share_link(&group));
        Ok(())
    }

    async fn join(&self) -> Result<(), DomainError> {
        let Some(code) = prompt(Text::new("Join code (6 characters):").prompt())? else {
            return Ok(());
        };
        let group = with_spinner("Joining…", self.service.join_by_code(&code)).await?;
        println!(
            "Joined {}, now {} members",
            group.display_label(),
            group.member_count
        );
        Ok(())
    }

    async fn lookup(&self) -> Result<(), DomainError> {
        let Some(code) = prompt(Text::new("Join code to look up:").prompt())? else {
            return Ok(());
        };
        let group = with_spinner("Looking up…", self.service.lookup_code(&code)).await?;
        println!("{}", group_row(&group));
        println!("Link: {}", self.service.share_link(&group));
        Ok(())
    }

    async fn rename(&self) -> Result<(), DomainError> {
        let groups = with_spinner("Loading groups…", self.service.list_groups()).await?;
        if groups.is_empty() {
            println!("No groups yet.");
            return Ok(());
        }
        let labels: Vec<String> = groups.iter().map(Group::display_label).collect();
        let Some(idx) = prompt(Select::new("Group to rename:", labels).raw_prompt())?
            .map(|choice| choice.index)
        else {
            return Ok(());
        };
        let target = &groups[idx];
        let Some(new_name) = prompt(
            Text::new("New name:")
                .with_initial_value(&target.name)
                .prompt(),
        )?
        else {
            return Ok(());
        };
        let renamed = self.service.rename_group(&target.id, &new_name).await?;
        println!("Renamed to {}", renamed.display_label());
        Ok(())
    }

    async fn list(&self) -> Result<(), DomainError> {
        let groups = with_spinner("Loading groups…", self.service.list_groups()).await?;
        print_directory(&groups);
        Ok(())
    }

    async fn watch(&self) -> Result<(), DomainError> {
        let projection = DirectoryProjection::activate(self.service.store()).await?;
        print_directory(&projection.snapshot().await);
        let mut changes = projection.changes();
        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        println!("Subscription ended.");
                        break;
                    }
                    println!("── directory updated ──");
                    print_directory(&projection.snapshot().await);
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        projection.deactivate();
        Ok(())
    }

    async fn export(&self) -> Result<(), DomainError> {
        let groups = with_spinner("Loading groups…", self.service.list_groups()).await?;
        let path = write_export(&self.export_dir, &groups).await?;
        println!("Exported {} groups to {}", groups.len(), path.display());
        Ok(())
    }
}

fn print_directory(groups: &[Group]) {
    if groups.is_empty() {
        println!("No groups yet.");
        return;
    }
    for g in groups {
        println!("{}", group_row(g));
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let action = match Select::new("What next?", MenuAction::ALL.to_vec()).prompt() {
                Ok(a) => a,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    MenuAction::Quit
                }
                Err(e) => return Err(DomainError::Ui(e.to_string())),
            };

            let result = match action {
                MenuAction::Create => self.create().await,
                MenuAction::Join => self.join().await,
                MenuAction::Lookup => self.lookup().await,
                MenuAction::Rename => self.rename().await,
                MenuAction::List => self.list().await,
                MenuAction::Watch => self.watch().await,
                MenuAction::Export => self.export().await,
                MenuAction::Quit => return Ok(()),
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is_user_facing() => println!("✗ {}", e),
                Err(e) => {
                    warn!(error = %e, action = %action, "action failed");
                    println!("✗ {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupId, JoinCode, NewGroup};
    use chrono::Utc;

    #[test]
    fn test_menu_lists_every_action_once() {
        let labels: Vec<String> = MenuAction::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(labels.len(), 8);
        assert_eq!(labels.last().map(String::as_str), Some("Quit"));
    }

    #[test]
    fn test_group_row_contains_code_and_count() {
        let draft = NewGroup::new("Eagles", "Team", JoinCode::parse("AB12CD").unwrap()).unwrap();
        let g = Group::from_new(GroupId("g1".into()), draft, Utc::now());
        let row = group_row(&g);
        assert!(row.contains("Eagles"));
        assert!(row.contains("members: 1"));
        assert!(row.contains("code: AB12CD"));
    }

    #[test]
    fn test_cancelled_prompt_is_none() {
        let r: Result<Option<String>, DomainError> = prompt(Err(InquireError::OperationCanceled));
        assert!(matches!(r, Ok(None)));
    }
}
