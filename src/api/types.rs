//! Request and response bodies of the management API

use serde::{Deserialize, Serialize};

use crate::actors::messages::{NodeKind, Position};
use crate::metrics::Metric;
use crate::system::{Edge, GraphSnapshot, NodeSnapshot};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSystemResponse {
    pub id: String,
}

/// Payload a node is rendered with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResponse {
    pub id: String,
    pub position: Position,
    pub data: NodeData,
}

impl From<NodeSnapshot> for NodeResponse {
    fn from(node: NodeSnapshot) -> Self {
        Self {
            id: node.id,
            position: node.position,
            data: NodeData {
                kind: node.kind,
                metrics: node.metrics,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeResponse {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl From<Edge> for EdgeResponse {
    fn from(edge: Edge) -> Self {
        Self {
            id: edge.id,
            source: edge.source,
            target: edge.target,
        }
    }
}

/// Current node/edge graph of a system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphResponse {
    pub id: String,
    pub nodes: Vec<NodeResponse>,
    pub edges: Vec<EdgeResponse>,
}

impl From<GraphSnapshot> for GraphResponse {
    fn from(graph: GraphSnapshot) -> Self {
        Self {
            id: graph.id,
            nodes: graph.nodes.into_iter().map(NodeResponse::from).collect(),
            edges: graph.edges.into_iter().map(EdgeResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNodeRequest {
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

/// New position of a node; fractional coordinates are rounded
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateNodeRequest {
    pub x: f64,
    pub y: f64,
}

impl UpdateNodeRequest {
    pub fn position(&self) -> Option<Position> {
        let x = self.x.round();
        let y = self.y.round();
        let range = f64::from(i32::MIN)..=f64::from(i32::MAX);

        (range.contains(&x) && range.contains(&y)).then(|| Position::new(x as i32, y as i32))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEdgeRequest {
    pub source: String,
    pub target: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_node_response_shape() {
        let node = NodeResponse::from(NodeSnapshot {
            id: "n".to_string(),
            kind: NodeKind::LoadBalancer,
            position: Position::new(1, 2),
            metrics: vec![],
        });

        assert_eq!(
            serde_json::to_value(node).unwrap(),
            json!({
                "id": "n",
                "position": {"x": 1, "y": 2},
                "data": {"type": "load balancer", "metrics": []},
            })
        );
    }

    #[test]
    fn test_update_node_rounds_and_rejects_out_of_range() {
        let update = UpdateNodeRequest { x: 10.6, y: -3.2 };
        assert_eq!(update.position(), Some(Position::new(11, -3)));

        let update = UpdateNodeRequest { x: f64::NAN, y: 0.0 };
        assert_eq!(update.position(), None);

        let update = UpdateNodeRequest { x: 1e12, y: 0.0 };
        assert_eq!(update.position(), None);
    }

    #[test]
    fn test_create_node_request_parses_type() {
        let request: CreateNodeRequest = serde_json::from_value(json!({"type": "server"})).unwrap();
        assert_eq!(request.kind, NodeKind::Server);
    }
}
