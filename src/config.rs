use crate::error::{Error, Result};
use crate::ir::Direction;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry of Parallel/Map containers while expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupLayoutConfig {
    pub branch_width: f32,
    pub row_height: f32,
    pub child_gap: f32,
    /// Total padding per axis (half on each side).
    pub padding: f32,
    pub empty_width: f32,
    pub empty_height: f32,
    /// Added on top of the size difference when an expanded group pushes later ranks.
    pub expansion_padding: f32,
}

impl Default for GroupLayoutConfig {
    fn default() -> Self {
        Self {
            branch_width: 200.0,
            row_height: 60.0,
            child_gap: 20.0,
            padding: 40.0,
            empty_width: 240.0,
            empty_height: 120.0,
            expansion_padding: 40.0,
        }
    }
}

/// Complexity-driven spacing policy. Each increment applies independently and
/// the sums are capped per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpacingConfig {
    pub base_node_gap: f32,
    pub base_rank_gap: f32,
    pub labeled_node_increment: f32,
    pub labeled_rank_increment: f32,
    pub choice_node_increment: f32,
    pub choice_rank_increment: f32,
    pub error_node_increment: f32,
    pub error_rank_increment: f32,
    pub group_node_increment: f32,
    pub group_rank_increment: f32,
    pub max_node_gap: f32,
    pub max_rank_gap: f32,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            base_node_gap: 50.0,
            base_rank_gap: 60.0,
            labeled_node_increment: 20.0,
            labeled_rank_increment: 20.0,
            choice_node_increment: 10.0,
            choice_rank_increment: 20.0,
            error_node_increment: 10.0,
            error_rank_increment: 20.0,
            group_node_increment: 20.0,
            group_rank_increment: 30.0,
            max_node_gap: 120.0,
            max_rank_gap: 160.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub direction: Direction,
    /// Task, Pass, Wait, Succeed and Fail.
    pub state_width: f32,
    /// Choice, Parallel and Map.
    pub wide_state_width: f32,
    pub state_height: f32,
    /// Diameter of the synthetic start/end circles.
    pub boundary_size: f32,
    /// Extra flow-axis room between two ranks joined by a labeled edge.
    pub label_rank_gap: f32,
    pub margin: f32,
    pub min_width: f32,
    pub min_height: f32,
    pub group: GroupLayoutConfig,
    pub spacing: SpacingConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TopDown,
            state_width: 180.0,
            wide_state_width: 200.0,
            state_height: 60.0,
            boundary_size: 60.0,
            label_rank_gap: 30.0,
            margin: 40.0,
            min_width: 400.0,
            min_height: 300.0,
            group: GroupLayoutConfig::default(),
            spacing: SpacingConfig::default(),
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<()> {
        let positive = [
            ("stateWidth", self.state_width),
            ("wideStateWidth", self.wide_state_width),
            ("stateHeight", self.state_height),
            ("boundarySize", self.boundary_size),
            ("group.branchWidth", self.group.branch_width),
            ("group.rowHeight", self.group.row_height),
            ("group.emptyWidth", self.group.empty_width),
            ("group.emptyHeight", self.group.empty_height),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config {
                    message: format!("{name} must be a positive number, got {value}"),
                });
            }
        }
        let non_negative = [
            ("labelRankGap", self.label_rank_gap),
            ("margin", self.margin),
            ("minWidth", self.min_width),
            ("minHeight", self.min_height),
            ("group.childGap", self.group.child_gap),
            ("group.padding", self.group.padding),
            ("group.expansionPadding", self.group.expansion_padding),
            ("spacing.baseNodeGap", self.spacing.base_node_gap),
            ("spacing.baseRankGap", self.spacing.base_rank_gap),
            ("spacing.labeledNodeIncrement", self.spacing.labeled_node_increment),
            ("spacing.labeledRankIncrement", self.spacing.labeled_rank_increment),
            ("spacing.choiceNodeIncrement", self.spacing.choice_node_increment),
            ("spacing.choiceRankIncrement", self.spacing.choice_rank_increment),
            ("spacing.errorNodeIncrement", self.spacing.error_node_increment),
            ("spacing.errorRankIncrement", self.spacing.error_rank_increment),
            ("spacing.groupNodeIncrement", self.spacing.group_node_increment),
            ("spacing.groupRankIncrement", self.spacing.group_rank_increment),
            ("spacing.maxNodeGap", self.spacing.max_node_gap),
            ("spacing.maxRankGap", self.spacing.max_rank_gap),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::Config {
                    message: format!("{name} must not be negative, got {value}"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationConfig {
    pub duration_ms: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self { duration_ms: 300.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub layout: LayoutConfig,
    pub animation: AnimationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    /// Accepts the short tokens (`TB`, `LR`) as well as the long names.
    direction: Option<String>,
    layout: Option<LayoutConfig>,
    animation: Option<AnimationConfig>,
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<Config> {
    let parsed: ConfigFile = serde_json::from_str(contents).map_err(|err| Error::Config {
        message: err.to_string(),
    })?;

    let mut config = Config::default();
    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(token) = parsed.direction.as_deref() {
        config.layout.direction = Direction::from_token(token).ok_or_else(|| Error::Config {
            message: format!("unknown direction `{token}`"),
        })?;
    }
    if let Some(animation) = parsed.animation {
        if !(animation.duration_ms.is_finite() && animation.duration_ms >= 0.0) {
            return Err(Error::Config {
                message: format!(
                    "animation.durationMs must not be negative, got {}",
                    animation.duration_ms
                ),
            });
        }
        config.animation = animation;
    }
    config.layout.validate()?;
    Ok(config)
}
