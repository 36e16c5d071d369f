//! Integration tests: solution workspace and file store (ld-editor).

use ld_core::{EmitOptions, TreeItemKind, Uid, UidKind};
use ld_editor::store::{load_solution, load_text, save_solution, save_text};
use ld_editor::{EditorConfig, StoreError, Workspace};

const PROJECT: &str = include_str!("fixtures/project.txt");
const TAGS: &str = include_str!("fixtures/tags.txt");

fn make_workspace() -> Workspace {
    Workspace::from_text(PROJECT, EditorConfig::default()).unwrap()
}

fn open_uid(ws: &Workspace) -> Uid {
    ws.tree.get(ws.open_item().unwrap()).unwrap().uid
}

#[test]
fn opens_first_diagram() {
    let ws = make_workspace();
    assert_eq!(open_uid(&ws), Uid::new(UidKind::Diagram, 2));
    assert_eq!(ws.canvas.diagram.len(), 3);
    assert_eq!(ws.tag_file(), Some("tags.txt"));
}

#[test]
fn navigation_crosses_projects() {
    let mut ws = make_workspace();
    assert!(!ws.previous().unwrap());
    assert!(ws.next().unwrap());
    assert_eq!(open_uid(&ws), Uid::new(UidKind::Diagram, 3));
    assert!(ws.next().unwrap());
    assert_eq!(open_uid(&ws), Uid::new(UidKind::Diagram, 5));
    assert!(ws.canvas.diagram.is_empty());
    assert!(!ws.next().unwrap());
    assert!(ws.previous().unwrap());
    assert_eq!(open_uid(&ws), Uid::new(UidKind::Diagram, 3));
}

#[test]
fn switching_keeps_edits_and_history() {
    let mut ws = make_workspace();
    let original = ws.canvas.text();
    let wire = ws.canvas.diagram.find(Uid::new(UidKind::Wire, 2)).unwrap();
    ws.canvas.toggle_wire_start(wire);
    let edited = ws.canvas.text();

    assert!(ws.open_diagram(Uid::new(UidKind::Diagram, 5)).unwrap());
    assert!(!ws.canvas.can_undo());
    assert!(ws.open_diagram(Uid::new(UidKind::Diagram, 2)).unwrap());

    assert_eq!(ws.canvas.text(), edited);
    assert!(ws.canvas.undo().unwrap());
    assert_eq!(ws.canvas.text(), original);
}

#[test]
fn history_survives_save_and_reload() {
    let mut ws = make_workspace();
    let original = ws.canvas.text();
    ws.canvas.select_all();
    ws.canvas.move_selected(30.0, 0.0);

    let text = ws.to_text(&EmitOptions {
        include_history: true,
    });
    assert_eq!(text.matches("+;Diagram|2;").count(), 2);

    let mut reloaded = Workspace::from_text(&text, EditorConfig::default()).unwrap();
    assert_eq!(reloaded.canvas.text(), ws.canvas.text());
    assert!(reloaded.canvas.undo().unwrap());
    assert_eq!(reloaded.canvas.text(), original);

    // the open canvas keeps its own history after serializing
    assert!(ws.canvas.can_undo());
}

#[test]
fn add_and_remove_items() {
    let mut ws = make_workspace();
    let added = ws.add_item().unwrap();
    let item = ws.tree.get(added).unwrap();
    assert_eq!(item.uid, Uid::new(UidKind::Diagram, 6));
    assert!(matches!(item.kind, TreeItemKind::Diagram { .. }));

    let project = ws.tree.find(Uid::new(UidKind::Project, 1)).unwrap();
    let removed = ws.remove_item(project).unwrap();
    assert_eq!(removed.len(), 4);
    assert_eq!(open_uid(&ws), Uid::new(UidKind::Diagram, 5));

    let text = ws.to_text(&EmitOptions::default());
    assert_eq!(
        text,
        "+;Solution|0;tags.txt\n+;Project|4\n+;Diagram|5;600;400;0;0;600;400;30;15;15;0;0\n"
    );
}

#[test]
fn store_round_trip_with_tags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plant.sln");
    save_text(&dir.path().join("tags.txt"), TAGS).unwrap();
    save_text(&path, PROJECT).unwrap();

    let mut ws = load_solution(&path, EditorConfig::default()).unwrap();
    assert_eq!(ws.tags.len(), 3);
    assert_eq!(ws.tags.get(2).unwrap().designation, "K1");

    ws.canvas.select_all();
    ws.canvas.reset_tags();
    save_solution(&path, &mut ws).unwrap();

    let saved = load_text(&path).unwrap();
    assert!(saved.contains("+;Input|0;30;30;-1"));
    assert!(saved.contains("+;Input|0;30;30;0"), "history entry keeps the tag");

    let reloaded = load_solution(&path, EditorConfig::default()).unwrap();
    assert!(reloaded.canvas.can_undo());
}

#[test]
fn missing_tag_file_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plant.sln");
    save_text(&path, PROJECT).unwrap();
    let ws = load_solution(&path, EditorConfig::default()).unwrap();
    assert!(ws.tags.is_empty());
}

#[test]
fn store_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.sln");
    assert!(matches!(
        load_solution(&missing, EditorConfig::default()),
        Err(StoreError::Io { .. })
    ));

    let broken = dir.path().join("broken.sln");
    save_text(&broken, "+;Solution|0\n+;Project|1\n+;Diagram|2;600;400;0;0;600;400;30;15;15;0;0\n+;Pin|0;x;0\n")
        .unwrap();
    let err = load_solution(&broken, EditorConfig::default()).unwrap_err();
    assert!(matches!(err, StoreError::Parse(_)));
    assert_eq!(err.to_string(), "line 4: field 2 `x` is not a number");
}
