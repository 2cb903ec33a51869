use std::collections::HashMap;

use serde_json::Value;
use snafu::{ensure, ResultExt};

use crate::error::{self, Error};
use crate::util::Result;

use super::{OperatorKernel, OperatorNode, OperatorSources};

/// Upper bound on the total source count of a single node
pub const MAX_SOURCES: usize = 5;

type OperatorFactory =
    Box<dyn Fn(&Value, OperatorSources) -> Result<Box<dyn OperatorKernel>> + Send + Sync>;

struct Registration {
    factory: OperatorFactory,
    commutative: bool,
}

/// Maps operator type names to kernel factories.
///
/// Built once during bootstrap and passed into the graph parser; there is no
/// process-global registration.
#[derive(Default)]
pub struct OperatorRegistry {
    registrations: HashMap<String, Registration>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, op_type: &str, factory: F)
    where
        F: Fn(&Value, OperatorSources) -> Result<Box<dyn OperatorKernel>> + Send + Sync + 'static,
    {
        self.registrations.insert(
            op_type.to_string(),
            Registration {
                factory: Box::new(factory),
                commutative: false,
            },
        );
    }

    /// Registers an operator whose semantic id does not depend on the order
    /// of its sources
    pub fn register_commutative<F>(&mut self, op_type: &str, factory: F)
    where
        F: Fn(&Value, OperatorSources) -> Result<Box<dyn OperatorKernel>> + Send + Sync + 'static,
    {
        self.registrations.insert(
            op_type.to_string(),
            Registration {
                factory: Box::new(factory),
                commutative: true,
            },
        );
    }

    /// Parses an operator graph from its JSON description.
    ///
    /// The parser is strict: nodes may only carry `type`, `params` and
    /// `sources`; source kinds are limited to `raster`, `points`, `lines`
    /// and `polygons`; unknown operator types fail the parse.
    pub fn from_json(&self, graph_json: &str) -> Result<OperatorNode> {
        let root: Value = serde_json::from_str(graph_json).context(error::GraphJson)?;
        self.node_from_value(&root, 0)
    }

    fn node_from_value(&self, value: &Value, depth: usize) -> Result<OperatorNode> {
        let object = value.as_object().ok_or(Error::GraphNodeNotAnObject)?;

        for key in object.keys() {
            ensure!(
                matches!(key.as_str(), "type" | "params" | "sources"),
                error::UnexpectedGraphKey { key: key.clone() }
            );
        }

        let op_type = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(Error::MissingOperatorType)?;

        // a missing or non-object `params` counts as empty
        let params = match object.get("params") {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            _ => Value::Object(serde_json::Map::new()),
        };

        let mut sources = OperatorSources::default();
        if let Some(sources_value) = object.get("sources") {
            let sources_object = sources_value
                .as_object()
                .ok_or(Error::SourcesNotAnObject)?;

            let declared: usize = sources_object
                .values()
                .map(|list| list.as_array().map_or(0, Vec::len))
                .sum();
            ensure!(
                declared <= MAX_SOURCES,
                error::TooManySources { max: MAX_SOURCES }
            );

            for (kind, list) in sources_object {
                let children = list
                    .as_array()
                    .ok_or_else(|| Error::SourcesNotAnArray { kind: kind.clone() })?
                    .iter()
                    .map(|child| self.node_from_value(child, depth + 1))
                    .collect::<Result<Vec<_>>>()?;

                match kind.as_str() {
                    "raster" => sources.raster = children,
                    "points" => sources.points = children,
                    "lines" => sources.lines = children,
                    "polygons" => sources.polygons = children,
                    _ => return Err(Error::UnknownSourceKind { kind: kind.clone() }),
                }
            }
        }

        let registration = self
            .registrations
            .get(op_type)
            .ok_or_else(|| Error::UnknownOperatorType {
                op_type: op_type.to_string(),
            })?;

        let semantic_id = semantic_id(op_type, &params, &sources, registration.commutative);
        let kernel = (registration.factory)(&params, sources)?;

        Ok(OperatorNode::new(
            op_type.to_string(),
            semantic_id,
            depth,
            kernel,
        ))
    }
}

/// Derives the deterministic subtree identity the cache keys on.
///
/// `serde_json` keeps object keys sorted, so equal parameter objects
/// serialize identically no matter how the request spelled them.
fn semantic_id(op_type: &str, params: &Value, sources: &OperatorSources, commutative: bool) -> String {
    let mut child_ids: Vec<&str> = sources
        .raster
        .iter()
        .chain(&sources.points)
        .chain(&sources.lines)
        .chain(&sources.polygons)
        .map(OperatorNode::semantic_id)
        .collect();

    if commutative {
        child_ids.sort_unstable();
    }

    format!("{}{}[{}]", op_type, params, child_ids.join(","))
}
