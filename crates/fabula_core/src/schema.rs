//! Canonical output-schema descriptions for the structured documents.
//!
//! Only the primary provider enforces output schemas mechanically; every
//! other path embeds the schema as prompt text. Both renderings derive from
//! one canonical [`SchemaNode`] per document so the strict and fallback
//! shapes cannot drift apart.

use serde_json::{Value, json};

/// One node of a canonical schema description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// A string field with a short description of its content
    Str {
        /// What the field should contain
        desc: &'static str,
    },
    /// An ordered array of the inner node
    Array(Box<SchemaNode>),
    /// An object with named fields; every field is required
    Object(Vec<(&'static str, SchemaNode)>),
}

impl SchemaNode {
    /// Render as a machine-checked response schema for strict enforcement.
    ///
    /// Produces the uppercase-type structure the primary provider's
    /// `responseSchema` field expects, with every object property required.
    pub fn to_strict_schema(&self) -> Value {
        match self {
            SchemaNode::Str { desc } => json!({ "type": "STRING", "description": desc }),
            SchemaNode::Array(inner) => json!({
                "type": "ARRAY",
                "items": inner.to_strict_schema(),
            }),
            SchemaNode::Object(fields) => {
                let mut properties = serde_json::Map::new();
                let mut required = Vec::new();
                for (name, node) in fields {
                    properties.insert((*name).to_string(), node.to_strict_schema());
                    required.push(Value::String((*name).to_string()));
                }
                json!({
                    "type": "OBJECT",
                    "properties": Value::Object(properties),
                    "required": Value::Array(required),
                })
            }
        }
    }

    /// Render as a human-readable JSON skeleton for schema-in-prompt requests.
    pub fn to_prompt_block(&self) -> String {
        let mut out = String::new();
        self.write_skeleton(&mut out, 0);
        format!(
            "Respond with ONLY a valid JSON object of exactly this shape, with no \
             markdown fences and no commentary:\n{out}"
        )
    }

    fn write_skeleton(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        match self {
            SchemaNode::Str { desc } => {
                out.push_str(&format!("\"<{desc}>\""));
            }
            SchemaNode::Array(inner) => {
                out.push_str("[\n");
                out.push_str(&"  ".repeat(indent + 1));
                inner.write_skeleton(out, indent + 1);
                out.push_str(&format!("\n{pad}]"));
            }
            SchemaNode::Object(fields) => {
                out.push_str("{\n");
                for (i, (name, node)) in fields.iter().enumerate() {
                    out.push_str(&format!("{}\"{}\": ", "  ".repeat(indent + 1), name));
                    node.write_skeleton(out, indent + 1);
                    if i + 1 < fields.len() {
                        out.push(',');
                    }
                    out.push('\n');
                }
                out.push_str(&format!("{pad}}}"));
            }
        }
    }
}

fn named_element() -> SchemaNode {
    SchemaNode::Object(vec![
        ("name", SchemaNode::Str { desc: "element name" }),
        (
            "description",
            SchemaNode::Str {
                desc: "visual description for illustration",
            },
        ),
    ])
}

/// Canonical schema for [`crate::StoryAnalysis`].
pub fn analysis_schema() -> SchemaNode {
    SchemaNode::Object(vec![
        ("title", SchemaNode::Str { desc: "story title" }),
        ("characters", SchemaNode::Array(Box::new(named_element()))),
        (
            "scenes",
            SchemaNode::Array(Box::new(SchemaNode::Object(vec![(
                "description",
                SchemaNode::Str {
                    desc: "visual description of the scene",
                },
            )]))),
        ),
        ("props", SchemaNode::Array(Box::new(named_element()))),
        ("animals_plants", SchemaNode::Array(Box::new(named_element()))),
        ("others", SchemaNode::Array(Box::new(named_element()))),
        (
            "plot_points",
            SchemaNode::Array(Box::new(SchemaNode::Object(vec![
                (
                    "description",
                    SchemaNode::Str {
                        desc: "what happens at this point",
                    },
                ),
                (
                    "suggested_visual",
                    SchemaNode::Str {
                        desc: "suggested illustration, in English",
                    },
                ),
            ]))),
        ),
    ])
}

/// Canonical schema for [`crate::StoryPolish`].
pub fn polish_schema() -> SchemaNode {
    SchemaNode::Object(vec![
        (
            "critique",
            SchemaNode::Str {
                desc: "critique of the original story",
            },
        ),
        (
            "rewritten_story",
            SchemaNode::Str {
                desc: "the improved story text",
            },
        ),
        (
            "changes_made",
            SchemaNode::Array(Box::new(SchemaNode::Str {
                desc: "one change made by the rewrite",
            })),
        ),
    ])
}
