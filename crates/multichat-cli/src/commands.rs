//! Command implementations. Each prints to stdout and returns `anyhow::Result`.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use multichat_core::persistence::THEME_NAMES;
use multichat_core::{AppContext, AppState, ExportSelection, ImportMode, MemberDraft, PrivacyLevel};

use crate::Command;

pub fn run(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::List => list(ctx),
        Command::Stats => stats(ctx),
        Command::AddMember {
            name,
            tags,
            background,
            privacy,
        } => add_member(ctx, &name, &tags, &background, privacy),
        Command::Switch { id } => {
            let member = ctx.switch_member(&id)?;
            println!("Now speaking as {}", member.name);
            Ok(())
        }
        Command::DeleteMember { id } => {
            let member = ctx.delete_member(&id)?;
            println!("Deleted member {}", member.name);
            Ok(())
        }
        Command::NewConversation { name } => {
            let conversation = ctx.create_conversation(&name)?;
            println!("Created conversation {} ({})", conversation.name, conversation.id);
            Ok(())
        }
        Command::Select { id } => {
            ctx.select_conversation(&id)?;
            println!("Opened conversation {id}");
            Ok(())
        }
        Command::RenameConversation { id, name } => {
            let conversation = ctx.rename_conversation(&id, &name)?;
            println!("Renamed conversation to {}", conversation.name);
            Ok(())
        }
        Command::DeleteConversation { id } => {
            let conversation = ctx.delete_conversation(&id)?;
            println!("Deleted conversation {}", conversation.name);
            Ok(())
        }
        Command::Send {
            content,
            conversation,
            sender,
        } => send(ctx, &content.join(" "), conversation.as_deref(), sender.as_deref()),
        Command::History { id } => history(ctx, id.as_deref()),
        Command::Search { query } => search(ctx, &query),
        Command::Export {
            path,
            no_members,
            no_conversations,
            no_settings,
        } => {
            let selection = ExportSelection {
                conversations: !no_conversations,
                members: !no_members,
                settings: !no_settings,
            };
            export(ctx, &path, selection)
        }
        Command::Import { path, mode } => import(ctx, &path, mode),
        Command::Preview { path } => preview(ctx, &path),
        Command::ClearHistory { yes } => clear_history(ctx, yes),
        Command::Theme { index } => {
            let settings = ctx.set_theme(index)?;
            println!("Theme set to {}", THEME_NAMES[settings.theme_index]);
            Ok(())
        }
    }
}

fn list(ctx: &AppContext) -> Result<()> {
    ctx.with_state(|state: &AppState| {
        println!("Members:");
        let current_member = state.members.current().map(|m| m.id.as_str());
        for member in state.members.iter() {
            let marker = if Some(member.id.as_str()) == current_member { "*" } else { " " };
            println!("  {marker} {:<24} {}", member.name, member.id);
        }

        println!();
        println!("Conversations:");
        let current_conversation = state.conversations.current().map(|c| c.id.as_str());
        for conversation in state.conversations.iter() {
            let marker = if Some(conversation.id.as_str()) == current_conversation {
                "*"
            } else {
                " "
            };
            println!(
                "  {marker} {:<24} {:>5} messages  {}",
                conversation.name,
                conversation.messages.len(),
                conversation.id
            );
        }
    });
    Ok(())
}

fn stats(ctx: &AppContext) -> Result<()> {
    let state = ctx.snapshot();

    println!("multichat data");
    println!("{}", "=".repeat(40));
    println!("  Data directory:  {}", ctx.data_dir().display());
    println!("  Members:         {}", state.members.len());
    println!("  Conversations:   {}", state.conversations.len());
    println!("  Messages:        {}", state.conversations.message_count());
    println!();
    println!("Settings:");
    println!("  Theme:           {}", state.settings.theme_name());
    println!("  Font size:       {}", state.settings.font_size);
    println!("  Notifications:   {}", state.settings.enable_notifications);
    println!("  Animations:      {}", state.settings.enable_animations);
    println!("  Sound effects:   {}", state.settings.enable_sound_effects);
    println!("  Auto save:       {}", state.settings.auto_save_enabled);
    Ok(())
}

fn add_member(
    ctx: &AppContext,
    name: &str,
    tags: &str,
    background: &str,
    privacy: PrivacyLevel,
) -> Result<()> {
    let draft = MemberDraft {
        name: name.to_string(),
        personality_tags: multichat_core::model::parse_tags(tags),
        background_memory: background.to_string(),
        privacy_level: privacy,
        ..MemberDraft::default()
    };
    let member = ctx.create_member(draft)?;
    println!("Created member {} ({})", member.name, member.id);
    Ok(())
}

fn send(
    ctx: &AppContext,
    content: &str,
    conversation: Option<&str>,
    sender: Option<&str>,
) -> Result<()> {
    if let Some(id) = sender {
        ctx.switch_member(id)?;
    }
    if let Some(id) = conversation {
        ctx.select_conversation(id)?;
    }
    let message = ctx.send_message(content)?;
    println!("Sent {}", message.id);
    Ok(())
}

fn history(ctx: &AppContext, id: Option<&str>) -> Result<()> {
    let state = ctx.snapshot();
    let conversation = match id {
        Some(id) => state.conversations.find(id),
        None => state.conversations.current(),
    }
    .context("no such conversation")?;

    println!("{}", conversation.name);
    for message in &conversation.messages {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            message.sender.name,
            message.content
        );
    }
    Ok(())
}

fn search(ctx: &AppContext, query: &str) -> Result<()> {
    let hits = ctx.search(query);
    if hits.is_empty() {
        println!("No messages match {query:?}");
        return Ok(());
    }

    for hit in &hits {
        println!(
            "[{}] {} / {}: {}",
            hit.message.timestamp.format("%Y-%m-%d %H:%M"),
            hit.conversation_name,
            hit.message.sender.name,
            hit.message.content
        );
    }
    println!("{} matches", hits.len());
    Ok(())
}

fn export(ctx: &AppContext, path: &Path, selection: ExportSelection) -> Result<()> {
    let summary = ctx
        .export_bundle(path, selection)
        .with_context(|| format!("failed to export to {}", path.display()))?;
    println!("{}", summary.status_message());
    Ok(())
}

fn import(ctx: &AppContext, path: &Path, mode: ImportMode) -> Result<()> {
    let summary = ctx
        .import_bundle(path, mode)
        .with_context(|| format!("failed to import {}", path.display()))?;
    println!("{}", summary.status_message());
    Ok(())
}

fn preview(ctx: &AppContext, path: &Path) -> Result<()> {
    let preview = ctx
        .preview_bundle(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    println!("Bundle {}", path.display());
    println!("  Exported:        {}", preview.export_date.to_rfc3339());
    println!("  App version:     {}", preview.app_version);
    println!("  Members:         {}", preview.members);
    println!("  Conversations:   {}", preview.conversations);
    println!("  Messages:        {}", preview.messages);
    println!("  Settings:        {}", if preview.has_settings { "yes" } else { "no" });
    Ok(())
}

fn clear_history(ctx: &AppContext, yes: bool) -> Result<()> {
    if !yes {
        println!("This permanently deletes every conversation and message.");
        print!("Type YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if input.trim() != "YES" {
            bail!("clear-history cancelled");
        }
    }

    ctx.clear_history()?;
    println!("Conversation history cleared.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn context(dir: &Path) -> AppContext {
        let ctx = AppContext::builder().data_dir(dir).build().unwrap();
        ctx.load_all();
        ctx
    }

    #[test]
    fn send_with_overrides_selects_first() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        run(
            &ctx,
            Command::AddMember {
                name: "Ash".into(),
                tags: "calm, kind".into(),
                background: String::new(),
                privacy: PrivacyLevel::Public,
            },
        )
        .unwrap();
        let birch = ctx.create_member(MemberDraft::named("Birch")).unwrap();
        let first = ctx.create_conversation("One").unwrap();
        ctx.create_conversation("Two").unwrap();

        send(&ctx, "hello", Some(&first.id), Some(&birch.id)).unwrap();

        let state = context(dir.path()).snapshot();
        let one = state.conversations.find(&first.id).unwrap();
        assert_eq!(one.messages.len(), 1);
        assert_eq!(one.messages[0].sender.name, "Birch");
        let ash = state.members.iter().find(|m| m.name == "Ash").unwrap();
        assert_eq!(ash.personality_tags, vec!["calm", "kind"]);
    }

    #[test]
    fn export_then_import_into_fresh_directory() {
        let source = tempdir().unwrap();
        let target = tempdir().unwrap();
        let bundle = source.path().join("backup.json");

        let ctx = context(source.path());
        ctx.create_member(MemberDraft::named("Ash")).unwrap();
        export(&ctx, &bundle, ExportSelection::all()).unwrap();

        let other = context(target.path());
        import(&other, &bundle, ImportMode::Replace).unwrap();

        assert_eq!(context(target.path()).snapshot().members.len(), 1);
    }

    #[test]
    fn history_of_unknown_conversation_fails() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        assert!(history(&ctx, Some("missing")).is_err());
    }

    #[test]
    fn clear_history_with_yes_skips_prompt() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.create_conversation("One").unwrap();

        clear_history(&ctx, true).unwrap();

        assert!(ctx.snapshot().conversations.is_empty());
    }
}
