use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use character_graph::config::{load_config, GraphConfig, IN_MEMORY_DB};
use character_graph::graph::{
    Character, CharacterId, GraphDb, GraphDbError, GraphRepository, RelationshipDetail,
    RelationshipId, Vital,
};
use character_graph::selection::{SelectionState, ViewMode};
use character_graph::ui::navigation::{
    character_actions, character_menu, characters_root_item, render_list, render_relationships,
    render_vitals, CharacterAction, ListItem,
};

const COMMANDS: &str = "Commands: list | show <slug> | create <name> | rename <slug> <name> | delete <slug> | star <slug> on|off | select <slug> on|off | vital <slug> <name>=<value> | vitals <slug> <name>=<value>;... | unvital <slug> <name> | relate <slug> [#id] <label>=<target> | unrelate <id> | rels <slug> | targets <slug> | go <path> | pick <slug> | unpick <slug> | picks | mode [column|graph] | json <slug> | quit";

#[derive(Serialize)]
struct CharacterView {
    character: Character,
    vitals: Vec<Vital>,
    relationships: Vec<RelationshipDetail>,
    actions: Vec<ListItem>,
}

struct ConsoleArgs {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
}

fn main() {
    let args = parse_args(env::args().collect());
    let mut config = match &args.config_path {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Failed to load config: {}", err);
                std::process::exit(1);
            }
        },
        None => GraphConfig::default(),
    };
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }
    init_tracing(&config.log_level);

    let opened = if config.db_path.as_os_str() == IN_MEMORY_DB {
        GraphDb::open_in_memory()
    } else {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = std::fs::create_dir_all(parent) {
                    eprintln!("Failed to create {}: {}", parent.display(), err);
                    std::process::exit(1);
                }
            }
        }
        GraphDb::open_with(&config.db_path, &config)
    };
    let mut repo: Box<dyn GraphRepository> = match opened {
        Ok(db) => Box::new(db),
        Err(err) => {
            eprintln!("Failed to open character DB: {}", err);
            std::process::exit(1);
        }
    };
    let mut selection = SelectionState::new();
    selection.subscribe(|change, snapshot| {
        tracing::debug!(?change, current = ?snapshot.current_character, "selection observer");
    });

    println!("Character graph console ({})", config.db_path.display());
    println!("{}", COMMANDS);
    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (cmd, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
            None => (trimmed.to_lowercase(), ""),
        };

        match cmd.as_str() {
            "quit" | "exit" => break,
            "help" => println!("{}", COMMANDS),
            "list" => print_menu(repo.as_ref(), &selection),
            "show" => show_character(repo.as_ref(), rest),
            "create" => match repo.create_character(rest) {
                Ok(slug) => println!("Created {}", slug),
                Err(err) => print_error(&err),
            },
            "rename" => match rest.split_once(char::is_whitespace) {
                Some((slug, name)) => match repo.rename_character(slug, name) {
                    Ok(()) => println!("Renamed {} (slug unchanged)", slug),
                    Err(err) => print_error(&err),
                },
                None => println!("Usage: rename <slug> <name>"),
            },
            "delete" => {
                if let Some(id) = resolve(repo.as_ref(), rest) {
                    match repo.delete_character(id) {
                        Ok(report) => {
                            selection.remove_from_multi_selection(rest);
                            println!(
                                "Deleted {} ({} vitals, {} relationships)",
                                rest, report.vitals, report.relationships
                            );
                        }
                        Err(err) => print_error(&err),
                    }
                }
            }
            "star" => match rest.split_once(char::is_whitespace) {
                Some((slug, flag)) if flag == "on" || flag == "off" => {
                    match repo.set_starred(slug, flag == "on") {
                        Ok(()) => println!("Starred {}: {}", slug, flag),
                        Err(err) => print_error(&err),
                    }
                }
                _ => println!("Usage: star <slug> on|off"),
            },
            "select" => match rest.split_once(char::is_whitespace) {
                Some((slug, flag)) if flag == "on" || flag == "off" => {
                    match repo.set_selected(slug, flag == "on") {
                        Ok(()) => println!("Selected {}: {}", slug, flag),
                        Err(err) => print_error(&err),
                    }
                }
                _ => println!("Usage: select <slug> on|off"),
            },
            "vital" => {
                let parsed = rest
                    .split_once(char::is_whitespace)
                    .and_then(|(slug, pair)| pair.split_once('=').map(|(n, v)| (slug, n, v)));
                match parsed {
                    Some((slug, name, value)) => {
                        if let Some(id) = resolve(repo.as_ref(), slug) {
                            match repo.upsert_vital(id, name.trim(), value.trim()) {
                                Ok(()) => println!("Saved {} for {}", name.trim(), slug),
                                Err(err) => print_error(&err),
                            }
                        }
                    }
                    None => println!("Usage: vital <slug> <name>=<value>"),
                }
            }
            "vitals" => match rest.split_once(char::is_whitespace) {
                Some((slug, form)) => match parse_vitals_form(form) {
                    Some(pairs) => {
                        if let Some(id) = resolve(repo.as_ref(), slug) {
                            match repo.update_vitals(id, &pairs) {
                                Ok(()) => println!("Saved {} vitals for {}", pairs.len(), slug),
                                Err(err) => print_error(&err),
                            }
                        }
                    }
                    None => println!("Usage: vitals <slug> <name>=<value>;..."),
                },
                None => println!("Usage: vitals <slug> <name>=<value>;..."),
            },
            "unvital" => match rest.split_once(char::is_whitespace) {
                Some((slug, name)) => {
                    if let Some(id) = resolve(repo.as_ref(), slug) {
                        match repo.delete_vital(id, name) {
                            Ok(true) => println!("Removed {} from {}", name, slug),
                            Ok(false) => println!("{} has no vital {}", slug, name),
                            Err(err) => print_error(&err),
                        }
                    }
                }
                None => println!("Usage: unvital <slug> <name>"),
            },
            "relate" => match parse_relate(rest) {
                Some((slug, id, label, target)) => {
                    match repo.upsert_relationship(slug, id, label, target) {
                        Ok(id) => println!("Saved relationship {}", id),
                        Err(err) => print_error(&err),
                    }
                }
                None => println!("Usage: relate <slug> [#id] <label>=<target>"),
            },
            "unrelate" => match rest.parse::<i64>() {
                Ok(id) => match repo.delete_relationship(RelationshipId(id)) {
                    Ok(()) => println!("Removed relationship {}", id),
                    Err(err) => print_error(&err),
                },
                Err(_) => println!("Usage: unrelate <id>"),
            },
            "rels" => match repo.list_outgoing_for_slug(rest) {
                Ok(details) => print!("{}", render_relationships(&details)),
                Err(err) => print_error(&err),
            },
            "targets" => match repo.list_candidate_targets(rest) {
                Ok(targets) => {
                    for target in targets {
                        println!("  {} ({})", target.name, target.slug);
                    }
                }
                Err(err) => print_error(&err),
            },
            "go" => {
                selection.set_current_from_path(rest);
                match selection.current_character() {
                    Some(slug) => println!("Current: {}", slug),
                    None => println!("Current: (no selection)"),
                }
            }
            "pick" | "unpick" if rest.is_empty() => println!("Usage: {} <slug>", cmd),
            "pick" => selection.add_to_multi_selection(rest),
            "unpick" => selection.remove_from_multi_selection(rest),
            "picks" => {
                let snapshot = selection.snapshot();
                let mut picks: Vec<&String> = snapshot.multi_selection.iter().collect();
                picks.sort();
                println!("Picked: {:?}", picks);
            }
            "mode" => {
                if rest.is_empty() {
                    selection.toggle_view_mode();
                } else {
                    match rest.parse::<ViewMode>() {
                        Ok(mode) => selection.set_view_mode(mode),
                        Err(err) => println!("{}", err),
                    }
                }
                println!("View mode: {}", selection.view_mode().as_str());
            }
            "json" => print_json(repo.as_ref(), rest),
            _ => println!("Unknown command. Type 'help' for commands."),
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_args(args: Vec<String>) -> ConsoleArgs {
    let mut iter = args.iter().skip(1);
    let mut parsed = ConsoleArgs {
        config_path: None,
        db_path: None,
    };
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(value) = iter.next() {
                    parsed.config_path = Some(PathBuf::from(value));
                }
            }
            "--db" => {
                if let Some(value) = iter.next() {
                    parsed.db_path = Some(PathBuf::from(value));
                }
            }
            _ => {}
        }
    }
    parsed
}

/// `<slug> [#id] <label>=<target>`
fn parse_relate(rest: &str) -> Option<(&str, Option<RelationshipId>, &str, &str)> {
    let (slug, tail) = rest.split_once(char::is_whitespace)?;
    let tail = tail.trim_start();
    let (id, tail) = match tail.strip_prefix('#') {
        Some(stripped) => {
            let (raw, tail) = stripped.split_once(char::is_whitespace)?;
            (Some(RelationshipId(raw.parse().ok()?)), tail)
        }
        None => (None, tail),
    };
    let (label, target) = tail.split_once('=')?;
    Some((slug, id, label.trim(), target.trim()))
}

/// `<name>=<value>;<name>=<value>...`
fn parse_vitals_form(form: &str) -> Option<Vec<(String, String)>> {
    form.split(';')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn resolve(repo: &dyn GraphRepository, slug: &str) -> Option<CharacterId> {
    match repo.resolve_id(slug) {
        Ok(Some(id)) => Some(id),
        Ok(None) => {
            println!("Character not found: {}", slug);
            None
        }
        Err(err) => {
            print_error(&err);
            None
        }
    }
}

fn print_error(err: &GraphDbError) {
    match err {
        GraphDbError::NotFound { .. } => println!("Not found: {}", err),
        GraphDbError::Validation { .. } => println!("Invalid input: {}", err),
        _ => println!("Error: {}", err),
    }
}

fn print_menu(repo: &dyn GraphRepository, selection: &SelectionState) {
    match repo.list_characters() {
        Ok(characters) => {
            let current = selection.current_character();
            let mut menu = vec![characters_root_item(current.is_none())];
            menu.extend(character_menu(&characters, current));
            print!("{}", render_list(&menu));
        }
        Err(err) => print_error(&err),
    }
}

fn load_view(repo: &dyn GraphRepository, slug: &str) -> Result<Option<CharacterView>, GraphDbError> {
    let Some(character) = repo.get_character(slug)? else {
        return Ok(None);
    };
    let vitals = repo.list_vitals(character.id)?;
    let relationships = repo.list_outgoing_with_details(character.id)?;
    let actions = character_actions(&character.slug, None);
    Ok(Some(CharacterView {
        character,
        vitals,
        relationships,
        actions,
    }))
}

fn show_character(repo: &dyn GraphRepository, slug: &str) {
    match load_view(repo, slug) {
        Ok(Some(view)) => {
            let star = if view.character.starred { " *" } else { "" };
            println!("{} [{}]{}", view.character.name, view.character.slug, star);
            println!("{}", CharacterAction::Vitals.label());
            print!("{}", render_vitals(&view.vitals));
            println!("{}", CharacterAction::Relationships.label());
            print!("{}", render_relationships(&view.relationships));
        }
        Ok(None) => println!("Character not found: {}", slug),
        Err(err) => print_error(&err),
    }
}

fn print_json(repo: &dyn GraphRepository, slug: &str) {
    match load_view(repo, slug) {
        Ok(Some(view)) => match serde_json::to_string_pretty(&view) {
            Ok(json) => println!("{}", json),
            Err(err) => println!("Error: {}", err),
        },
        Ok(None) => println!("Character not found: {}", slug),
        Err(err) => print_error(&err),
    }
}
