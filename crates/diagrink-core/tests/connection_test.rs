use diagrink_core::{
    CellId, CellStyle, ConnectionConstraint, Graph, GraphEvent, History, ModelChange, ModelEvent, Stencil,
    UndoableEdit,
};
use kurbo::{Point, Rect, Vec2};
use std::cell::RefCell;
use std::rc::Rc;

fn two_boxes() -> (Graph, CellId, CellId, CellId) {
    let mut graph = Graph::new();
    let layer = graph.model.default_parent();
    let a = graph
        .add_vertex(layer, Rect::new(0.0, 0.0, 100.0, 50.0), CellStyle::default())
        .unwrap();
    let b = graph
        .add_vertex(layer, Rect::new(300.0, 0.0, 400.0, 50.0), CellStyle::default())
        .unwrap();
    let e = graph.add_edge(layer, Some(a), Some(b), CellStyle::default()).unwrap();
    (graph, a, b, e)
}

fn model_edits(graph: &mut Graph) -> Rc<RefCell<Vec<UndoableEdit<ModelChange>>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    graph.model.events.subscribe(move |event| match event {
        ModelEvent::Change { edit } => sink.borrow_mut().push(edit.clone()),
    });
    seen
}

#[test]
fn stored_constraint_reads_back() {
    let (mut graph, _, _, e) = two_boxes();
    let constraint = ConnectionConstraint::new(Some(Point::new(0.25, 0.75)), true).with_offset(3.0, -2.0);
    graph.set_connection_constraint(e, true, Some(&constraint)).unwrap();

    let read = graph.get_connection_constraint(e, true);
    let p = read.point.unwrap();
    assert!((p.x - 0.25).abs() < 0.001);
    assert!((p.y - 0.75).abs() < 0.001);
    assert_eq!((read.dx, read.dy), (3.0, -2.0));
    assert!(read.perimeter);
    assert!(graph.get_connection_constraint(e, false).point.is_none());
}

#[test]
fn perimeter_flag_encoding() {
    let (mut graph, _, _, e) = two_boxes();
    let on = ConnectionConstraint::new(Some(Point::new(1.0, 0.5)), true);
    graph.set_connection_constraint(e, false, Some(&on)).unwrap();
    let map = graph.model.style(e).unwrap().to_map();
    assert!(!map.contains_key("entryPerimeter"));

    let off = ConnectionConstraint::new(Some(Point::new(1.0, 0.5)), false);
    graph.set_connection_constraint(e, false, Some(&off)).unwrap();
    let map = graph.model.style(e).unwrap().to_map();
    assert_eq!(map.get("entryPerimeter").map(String::as_str), Some("0"));
    assert!(!graph.get_connection_constraint(e, false).perimeter);

    graph.set_connection_constraint(e, false, Some(&on)).unwrap();
    let map = graph.model.style(e).unwrap().to_map();
    assert!(!map.contains_key("entryPerimeter"));
}

#[test]
fn clearing_removes_every_key_of_one_side() {
    let (mut graph, _, _, e) = two_boxes();
    let c = ConnectionConstraint::new(Some(Point::new(0.5, 0.5)), false).with_offset(1.0, 1.0);
    graph.set_connection_constraint(e, true, Some(&c)).unwrap();
    graph.set_connection_constraint(e, false, Some(&c)).unwrap();

    graph.set_connection_constraint(e, true, None).unwrap();
    let map = graph.model.style(e).unwrap().to_map();
    for key in ["exitX", "exitY", "exitDx", "exitDy", "exitPerimeter"] {
        assert!(!map.contains_key(key), "{key} should be cleared");
    }
    assert!(map.contains_key("entryX"));
    let cleared = graph.get_connection_constraint(e, true);
    assert!(cleared.point.is_none());
    assert!(cleared.perimeter);
    assert_eq!((cleared.dx, cleared.dy), (0.0, 0.0));

    graph
        .set_connection_constraint(e, false, Some(&ConnectionConstraint::default()))
        .unwrap();
    assert!(graph.model.style(e).unwrap().to_map().is_empty());
}

#[test]
fn click_on_right_middle_round_trips() {
    let (graph, a, _, _) = two_boxes();
    let c = graph.get_outline_constraint(Point::new(100.0, 25.0), a).unwrap();
    assert_eq!(c.point, Some(Point::new(1.0, 0.5)));
    assert!(!c.perimeter);
    assert_eq!(graph.get_connection_point(a, &c, true), Some(Point::new(100.0, 25.0)));
}

#[test]
fn connect_cell_is_one_transaction() {
    let mut graph = Graph::new();
    let layer = graph.model.default_parent();
    let a = graph
        .add_vertex(layer, Rect::new(0.0, 0.0, 100.0, 50.0), CellStyle::default())
        .unwrap();
    let b = graph
        .add_vertex(layer, Rect::new(300.0, 0.0, 400.0, 50.0), CellStyle::default())
        .unwrap();
    let e = graph.add_edge(layer, Some(a), None, CellStyle::default()).unwrap();

    let edits = model_edits(&mut graph);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    graph.events.subscribe(move |event: &GraphEvent| sink.borrow_mut().push(event.clone()));

    let constraint = graph.get_outline_constraint(Point::new(300.0, 25.0), b).unwrap();
    graph.connect_cell(e, Some(b), false, Some(&constraint)).unwrap();

    assert_eq!(edits.borrow().len(), 1);
    assert_eq!(
        *events.borrow(),
        vec![
            GraphEvent::CellConnected {
                edge: e,
                terminal: Some(b),
                is_source: false,
                previous: None,
            },
            GraphEvent::ConnectCell {
                edge: e,
                terminal: Some(b),
                is_source: false,
                previous: None,
            },
        ]
    );
    assert_eq!(graph.model.terminal(e, false), Some(b));
    assert_eq!(graph.resolve_connection_point(e, false), Some(Point::new(300.0, 25.0)));
    let points = &graph.view.state(e).unwrap().absolute_points;
    assert_eq!(points.last(), Some(&Point::new(300.0, 25.0)));
}

#[test]
fn connecting_to_a_port_links_its_owner() {
    let mut graph = Graph::new();
    let layer = graph.model.default_parent();
    let s = graph
        .add_vertex(layer, Rect::new(200.0, 0.0, 300.0, 50.0), CellStyle::default())
        .unwrap();
    let v = graph
        .add_vertex(layer, Rect::new(0.0, 0.0, 100.0, 50.0), CellStyle::default())
        .unwrap();
    let port = graph
        .add_port(v, Rect::new(90.0, 20.0, 100.0, 30.0), CellStyle::default())
        .unwrap();
    let e = graph.add_edge(layer, Some(s), None, CellStyle::default()).unwrap();

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    graph.events.subscribe(move |event: &GraphEvent| sink.borrow_mut().push(event.clone()));

    let center = ConnectionConstraint::new(Some(Point::new(0.5, 0.5)), false);
    graph.connect_cell(e, Some(port), false, Some(&center)).unwrap();

    assert_eq!(graph.model.terminal(e, false), Some(v));
    assert_eq!(graph.model.style(e).unwrap().target_port, Some(port));
    assert_eq!(graph.resolve_connection_point(e, false), Some(Point::new(95.0, 25.0)));
    assert!(matches!(
        events.borrow()[1],
        GraphEvent::ConnectCell { terminal: Some(t), .. } if t == port
    ));

    // Reconnecting to the vertex itself drops the port.
    graph.connect_cell(e, Some(v), false, None).unwrap();
    assert_eq!(graph.model.style(e).unwrap().target_port, None);
}

#[test]
fn connecting_resets_waypoints() {
    let (mut graph, _, b, e) = two_boxes();
    let mut geo = graph.model.geometry(e).cloned().unwrap();
    geo.points = vec![Point::new(200.0, 200.0)];
    graph.batch_update(|g| g.model.set_geometry(e, geo)).unwrap();
    assert_eq!(graph.view.state(e).unwrap().absolute_points.len(), 3);

    graph.connect_cell(e, Some(b), false, None).unwrap();
    assert!(graph.model.geometry(e).unwrap().points.is_empty());
    assert_eq!(graph.view.state(e).unwrap().absolute_points.len(), 2);
}

#[test]
fn disconnect_pins_outside_end_where_drawn() {
    let (mut graph, a, _, e) = two_boxes();
    let before = *graph.view.state(e).unwrap().absolute_points.last().unwrap();
    assert_eq!(before, Point::new(300.0, 25.0));

    graph.disconnect_graph(&[e, a]).unwrap();

    assert_eq!(graph.model.terminal(e, false), None);
    assert_eq!(graph.model.terminal(e, true), Some(a));
    let geo = graph.model.geometry(e).unwrap();
    assert_eq!(geo.target_point, Some(Point::new(300.0, 25.0)));
    assert_eq!(geo.source_point, None);

    let after = *graph.view.state(e).unwrap().absolute_points.last().unwrap();
    assert_eq!(after, before);
}

#[test]
fn disconnect_accounts_for_scale_and_translate() {
    let (mut graph, a, _, e) = two_boxes();
    graph.zoom_to(2.0);
    graph.set_translate(Vec2::new(10.0, 0.0));
    let before = *graph.view.state(e).unwrap().absolute_points.last().unwrap();
    assert_eq!(before, Point::new(620.0, 50.0));

    graph.disconnect_graph(&[e, a]).unwrap();
    let geo = graph.model.geometry(e).unwrap();
    assert_eq!(geo.target_point, Some(Point::new(300.0, 25.0)));
    assert_eq!(*graph.view.state(e).unwrap().absolute_points.last().unwrap(), before);
}

#[test]
fn disconnect_keeps_ends_inside_the_set() {
    let mut graph = Graph::new();
    let layer = graph.model.default_parent();
    let group = graph
        .add_vertex(layer, Rect::new(0.0, 0.0, 500.0, 100.0), CellStyle::default())
        .unwrap();
    let a = graph
        .add_vertex(group, Rect::new(0.0, 0.0, 100.0, 50.0), CellStyle::default())
        .unwrap();
    let b = graph
        .add_vertex(group, Rect::new(300.0, 0.0, 400.0, 50.0), CellStyle::default())
        .unwrap();
    let e = graph.add_edge(layer, Some(a), Some(b), CellStyle::default()).unwrap();

    graph.disconnect_graph(&[e, group]).unwrap();
    assert_eq!(graph.model.terminal(e, true), Some(a));
    assert_eq!(graph.model.terminal(e, false), Some(b));
}

#[test]
fn locked_edges_stay_connected() {
    let (mut graph, _, b, e) = two_boxes();
    graph.batch_update(|g| g.model.update_style(e, |s| s.locked = Some(true))).unwrap();
    graph.disconnect_graph(&[e]).unwrap();
    assert_eq!(graph.model.terminal(e, false), Some(b));
}

#[test]
fn connect_can_be_undone() {
    let (mut graph, a, b, e) = two_boxes();
    let edits = model_edits(&mut graph);
    let mut history = History::new();

    let c = ConnectionConstraint::new(Some(Point::new(0.0, 0.5)), false);
    graph.connect_cell(e, Some(a), false, Some(&c)).unwrap();
    for edit in edits.borrow_mut().drain(..) {
        history.push(edit);
    }
    assert_eq!(graph.model.terminal(e, false), Some(a));

    assert!(history.undo(&mut graph.model));
    graph.validate();
    assert_eq!(graph.model.terminal(e, false), Some(b));
    assert!(graph.get_connection_constraint(e, false).point.is_none());

    assert!(history.redo(&mut graph.model));
    assert_eq!(graph.model.terminal(e, false), Some(a));
}

#[test]
fn stencil_constraints_are_offered() {
    let mut graph = Graph::new();
    graph.stencils.register(Stencil::new(
        "gate",
        vec![
            ConnectionConstraint::new(Some(Point::new(0.0, 0.5)), false),
            ConnectionConstraint::new(Some(Point::new(1.0, 0.5)), false),
        ],
    ));
    let layer = graph.model.default_parent();
    let gate = graph
        .add_vertex(
            layer,
            Rect::new(0.0, 0.0, 40.0, 20.0),
            CellStyle {
                shape: Some("gate".into()),
                ..Default::default()
            },
        )
        .unwrap();
    let plain = graph
        .add_vertex(layer, Rect::new(50.0, 0.0, 90.0, 20.0), CellStyle::default())
        .unwrap();

    let offered = graph.get_all_connection_constraints(gate).unwrap();
    assert_eq!(offered.len(), 2);
    assert_eq!(graph.get_connection_point(gate, &offered[1], true), Some(Point::new(40.0, 10.0)));
    assert!(graph.get_all_connection_constraints(plain).is_none());
}
