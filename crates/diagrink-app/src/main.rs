//! Headless driver: builds a small diagram, wires an edge through connection
//! constraints, selects it and pans the view through an outline.
//!
//! Usage: `diagrink [config.json]`

use diagrink_core::{
    CellStyle, ConnectionConstraint, Container, Graph, GraphConfig, GraphError, Outline, OutlineConfig,
    OutlinePointer,
};
use kurbo::{Point, Rect, Size, Vec2};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

type AppResult<T> = Result<T, AppError>;

fn load_config(path: Option<&Path>) -> AppResult<GraphConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            let config = GraphConfig::from_json(&json)?;
            log::info!("loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(GraphConfig::default()),
    }
}

fn run(config: GraphConfig) -> AppResult<()> {
    let mut graph = Graph::with_config(config);
    graph.container = Container::new(800.0, 600.0);

    let layer = graph.model.default_parent();
    let source = graph.add_vertex(layer, Rect::new(40.0, 40.0, 160.0, 100.0), CellStyle::default())?;
    let target = graph.add_vertex(
        layer,
        Rect::new(400.0, 200.0, 520.0, 260.0),
        CellStyle {
            rotation: Some(90.0),
            ..Default::default()
        },
    )?;
    let port = graph.add_port(source, Rect::new(110.0, 20.0, 130.0, 40.0), CellStyle::default())?;
    let edge = graph.add_edge(layer, None, None, CellStyle::default())?;

    let exit = ConnectionConstraint::new(Some(Point::new(0.5, 0.5)), false);
    graph.connect_cell(edge, Some(port), true, Some(&exit))?;

    // Pick the anchor under a click on the target's top edge.
    let click = graph
        .view
        .state(target)
        .map(|state| Point::new(state.bounds.center().x, state.bounds.y0))
        .unwrap_or_default();
    let entry = graph
        .get_outline_constraint(click, target)
        .unwrap_or_else(|| ConnectionConstraint::new(None, true));
    log::info!("click {click:?} on target resolves to {:?}", entry.point);
    graph.connect_cell(edge, Some(target), false, Some(&entry))?;

    if let Some(state) = graph.view.state(edge) {
        log::info!("edge drawn through {:?}", state.absolute_points);
    }

    graph.set_selection_cells(&[edge, source]);
    log::info!("selected {} cell(s)", graph.selection.len());

    let mut outline = Outline::new(&mut graph, Size::new(200.0, 200.0), OutlineConfig::default())?;
    log::info!("outline scale {:.4}, viewport {:?}", outline.scale(), outline.bounds());

    let grab = outline.bounds().center();
    let drop = grab + Vec2::new(20.0, 10.0);
    if outline.mouse_down(&graph, OutlinePointer::mouse(grab.x, grab.y)) {
        outline.mouse_move(&mut graph, drop);
        outline.mouse_up(&mut graph, drop);
    }
    outline.sync(&graph);
    log::info!(
        "after pan: translate {:?}, outline viewport {:?}",
        graph.view.translate(),
        outline.bounds()
    );

    outline.destroy(&mut graph);
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Starting diagrink");

    let path = std::env::args().nth(1);
    let result = load_config(path.as_deref().map(Path::new)).and_then(run);
    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_without_path() {
        assert_eq!(load_config(None).unwrap(), GraphConfig::default());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "single_selection": true, "tolerance": 8.0 }}"#).unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert!(config.single_selection);
        assert_eq!(config.tolerance, 8.0);
    }

    #[test]
    fn test_config_errors() {
        let missing = load_config(Some(Path::new("/nonexistent/diagrink.json")));
        assert!(matches!(missing, Err(AppError::Io(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let bad = load_config(Some(file.path()));
        assert!(matches!(bad, Err(AppError::Graph(GraphError::InvalidConfig(_)))));
    }

    #[test]
    fn test_demo_runs() {
        run(GraphConfig::default()).unwrap();
    }
}
