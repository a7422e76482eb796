//! Default topology a new system is created with

use crate::actors::messages::{NodeKind, Position};
use crate::error::SystemResult;
use crate::system::System;

const CLIENT_POSITION: Position = Position::new(400, 425);
const LOAD_BALANCER_POSITION: Position = Position::new(700, 425);
const SERVER_POSITIONS: [Position; 3] = [
    Position::new(1050, 225),
    Position::new(1050, 425),
    Position::new(1050, 625),
];

/// One client behind one load balancer in front of three servers
pub fn default_topology(system: &System) -> SystemResult<()> {
    let client = system.add_node(NodeKind::Client);
    system.set_position(&client.id, CLIENT_POSITION)?;

    let lb = system.add_node(NodeKind::LoadBalancer);
    system.set_position(&lb.id, LOAD_BALANCER_POSITION)?;

    system.add_edge(&client.id, &lb.id)?;

    for position in SERVER_POSITIONS {
        let server = system.add_node(NodeKind::Server);
        system.set_position(&server.id, position)?;
        system.add_edge(&lb.id, &server.id)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    #[test]
    fn test_default_topology_shape() {
        let system = System::new(SimulationConfig::default()).unwrap();
        default_topology(&system).unwrap();

        let snapshot = system.snapshot();
        assert_eq!(snapshot.nodes.len(), 5);
        assert_eq!(snapshot.edges.len(), 4);

        let count = |kind| snapshot.nodes.iter().filter(|n| n.kind == kind).count();
        assert_eq!(count(NodeKind::Client), 1);
        assert_eq!(count(NodeKind::LoadBalancer), 1);
        assert_eq!(count(NodeKind::Server), 3);

        let lb = snapshot
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::LoadBalancer)
            .unwrap();
        assert_eq!(lb.position, LOAD_BALANCER_POSITION);
        assert_eq!(snapshot.edges[0].target, lb.id);
        assert!(snapshot.edges[1..].iter().all(|edge| edge.source == lb.id));
    }
}
