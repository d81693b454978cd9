//! Decoding of `redraw` notification payloads.
//!
//! A batch is the parameter array of one `redraw` notification, already
//! turned into a value tree by the transport. Each element is
//! `[name, args, args, ...]`: the event name followed by one or more
//! argument tuples, every tuple being one occurrence of the event.

use serde_json::Value;
use thiserror::Error;

use nvgrid_render::{CursorShape, HighlightFlags, HighlightUpdate, ModeInfo, Rgb};

/// A payload did not have the shape its event name requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("redraw batch is not an array")]
    NotABatch,

    #[error("redraw event {index} is not an array starting with a name")]
    MalformedEvent { index: usize },

    #[error("{event}: argument tuple {tuple} is not an array")]
    NotATuple { event: String, tuple: usize },

    #[error("{event}: missing or invalid '{field}'")]
    InvalidField { event: String, field: &'static str },
}

/// One cell run of a `grid_line` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCell {
    pub text: String,
    /// Absent means "same as the previous cell in this event".
    pub hl_id: Option<u64>,
    pub repeat: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedrawEvent {
    GridResize {
        grid: u64,
        cols: usize,
        rows: usize,
    },
    GridClear {
        grid: u64,
    },
    /// `None` keeps the current value of that channel.
    DefaultColorsSet {
        foreground: Option<Rgb>,
        background: Option<Rgb>,
        special: Option<Rgb>,
    },
    HlAttrDefine {
        id: u64,
        update: HighlightUpdate,
    },
    GridLine {
        grid: u64,
        row: usize,
        col_start: usize,
        cells: Vec<LineCell>,
    },
    GridCursorGoto {
        grid: u64,
        row: usize,
        col: usize,
    },
    ModeInfoSet {
        cursor_style_enabled: bool,
        modes: Vec<ModeInfo>,
    },
    ModeChange {
        mode: String,
        index: usize,
    },
    BusyStart,
    BusyStop,
    GridScroll {
        grid: u64,
        top: usize,
        bottom: usize,
        left: usize,
        right: usize,
        rows: i64,
        cols: i64,
    },
    SetTitle(String),
    OptionSet {
        name: String,
        value: Value,
    },
    Flush,
    /// An event this renderer does not handle.
    Unknown(String),
}

impl RedrawEvent {
    pub fn name(&self) -> &str {
        match self {
            RedrawEvent::GridResize { .. } => "grid_resize",
            RedrawEvent::GridClear { .. } => "grid_clear",
            RedrawEvent::DefaultColorsSet { .. } => "default_colors_set",
            RedrawEvent::HlAttrDefine { .. } => "hl_attr_define",
            RedrawEvent::GridLine { .. } => "grid_line",
            RedrawEvent::GridCursorGoto { .. } => "grid_cursor_goto",
            RedrawEvent::ModeInfoSet { .. } => "mode_info_set",
            RedrawEvent::ModeChange { .. } => "mode_change",
            RedrawEvent::BusyStart => "busy_start",
            RedrawEvent::BusyStop => "busy_stop",
            RedrawEvent::GridScroll { .. } => "grid_scroll",
            RedrawEvent::SetTitle(_) => "set_title",
            RedrawEvent::OptionSet { .. } => "option_set",
            RedrawEvent::Flush => "flush",
            RedrawEvent::Unknown(name) => name.as_str(),
        }
    }
}

/// Split a batch into its raw event arrays.
pub fn batch_events(batch: &Value) -> Result<&[Value], EventError> {
    batch
        .as_array()
        .map(Vec::as_slice)
        .ok_or(EventError::NotABatch)
}

/// Decode one `[name, args...]` element tuple by tuple. Every argument
/// tuple yields its own result, so one malformed tuple does not hide its
/// siblings; an event with no tuples (`["flush"]`) yields one result.
///
/// The outer error means the element itself has no usable name.
pub fn decode_tuples(
    index: usize,
    raw: &Value,
) -> Result<Vec<Result<RedrawEvent, EventError>>, EventError> {
    let items = raw
        .as_array()
        .ok_or(EventError::MalformedEvent { index })?;
    let (name, tuples) = items
        .split_first()
        .ok_or(EventError::MalformedEvent { index })?;
    let name = name.as_str().ok_or(EventError::MalformedEvent { index })?;

    if tuples.is_empty() {
        return Ok(vec![decode_args(name, &[])]);
    }
    Ok(tuples
        .iter()
        .enumerate()
        .map(|(tuple, args)| {
            let args = args.as_array().ok_or_else(|| EventError::NotATuple {
                event: name.to_string(),
                tuple,
            })?;
            decode_args(name, args)
        })
        .collect())
}

/// Decode one `[name, args...]` element, failing on the first malformed
/// tuple.
pub fn decode_event(index: usize, raw: &Value) -> Result<Vec<RedrawEvent>, EventError> {
    decode_tuples(index, raw)?.into_iter().collect()
}

/// Decode a whole batch, failing on the first malformed event.
pub fn decode_batch(batch: &Value) -> Result<Vec<RedrawEvent>, EventError> {
    let mut events = Vec::new();
    for (index, raw) in batch_events(batch)?.iter().enumerate() {
        events.extend(decode_event(index, raw)?);
    }
    Ok(events)
}

struct Args<'a> {
    event: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn invalid(&self, field: &'static str) -> EventError {
        EventError::InvalidField {
            event: self.event.to_string(),
            field,
        }
    }

    fn get(&self, index: usize, field: &'static str) -> Result<&'a Value, EventError> {
        self.values.get(index).ok_or_else(|| self.invalid(field))
    }

    fn u64(&self, index: usize, field: &'static str) -> Result<u64, EventError> {
        self.get(index, field)?
            .as_u64()
            .ok_or_else(|| self.invalid(field))
    }

    fn usize(&self, index: usize, field: &'static str) -> Result<usize, EventError> {
        usize::try_from(self.u64(index, field)?).map_err(|_| self.invalid(field))
    }

    fn i64(&self, index: usize, field: &'static str) -> Result<i64, EventError> {
        self.get(index, field)?
            .as_i64()
            .ok_or_else(|| self.invalid(field))
    }

    fn str(&self, index: usize, field: &'static str) -> Result<&'a str, EventError> {
        self.get(index, field)?
            .as_str()
            .ok_or_else(|| self.invalid(field))
    }

    /// A color channel; negative values mean "not set".
    fn color(&self, index: usize, field: &'static str) -> Result<Option<Rgb>, EventError> {
        let value = self.i64(index, field)?;
        Ok(u32::try_from(value).ok().map(Rgb::from_packed))
    }
}

fn decode_args(name: &str, values: &[Value]) -> Result<RedrawEvent, EventError> {
    let args = Args {
        event: name,
        values,
    };
    let event = match name {
        "grid_resize" => RedrawEvent::GridResize {
            grid: args.u64(0, "grid")?,
            cols: args.usize(1, "width")?,
            rows: args.usize(2, "height")?,
        },
        "grid_clear" => RedrawEvent::GridClear {
            grid: args.u64(0, "grid")?,
        },
        "default_colors_set" => RedrawEvent::DefaultColorsSet {
            foreground: args.color(0, "rgb_fg")?,
            background: args.color(1, "rgb_bg")?,
            special: args.color(2, "rgb_sp")?,
        },
        "hl_attr_define" => RedrawEvent::HlAttrDefine {
            id: args.u64(0, "id")?,
            update: highlight_update(&args, args.get(1, "rgb_attr")?)?,
        },
        "grid_line" => RedrawEvent::GridLine {
            grid: args.u64(0, "grid")?,
            row: args.usize(1, "row")?,
            col_start: args.usize(2, "col_start")?,
            cells: line_cells(&args, args.get(3, "cells")?)?,
        },
        "grid_cursor_goto" => RedrawEvent::GridCursorGoto {
            grid: args.u64(0, "grid")?,
            row: args.usize(1, "row")?,
            col: args.usize(2, "col")?,
        },
        "mode_info_set" => RedrawEvent::ModeInfoSet {
            cursor_style_enabled: args
                .get(0, "cursor_style_enabled")?
                .as_bool()
                .ok_or_else(|| args.invalid("cursor_style_enabled"))?,
            modes: mode_infos(&args, args.get(1, "mode_info")?)?,
        },
        "mode_change" => RedrawEvent::ModeChange {
            mode: args.str(0, "mode")?.to_string(),
            index: args.usize(1, "mode_idx")?,
        },
        "busy_start" => RedrawEvent::BusyStart,
        "busy_stop" => RedrawEvent::BusyStop,
        "grid_scroll" => RedrawEvent::GridScroll {
            grid: args.u64(0, "grid")?,
            top: args.usize(1, "top")?,
            bottom: args.usize(2, "bot")?,
            left: args.usize(3, "left")?,
            right: args.usize(4, "right")?,
            rows: args.i64(5, "rows")?,
            cols: args.i64(6, "cols")?,
        },
        "set_title" => RedrawEvent::SetTitle(args.str(0, "title")?.to_string()),
        "option_set" => RedrawEvent::OptionSet {
            name: args.str(0, "name")?.to_string(),
            value: args.get(1, "value")?.clone(),
        },
        "flush" => RedrawEvent::Flush,
        other => RedrawEvent::Unknown(other.to_string()),
    };
    Ok(event)
}

const FLAG_NAMES: [(&str, HighlightFlags); 6] = [
    ("reverse", HighlightFlags::REVERSE),
    ("italic", HighlightFlags::ITALIC),
    ("bold", HighlightFlags::BOLD),
    ("strikethrough", HighlightFlags::STRIKETHROUGH),
    ("underline", HighlightFlags::UNDERLINE),
    ("undercurl", HighlightFlags::UNDERCURL),
];

fn highlight_update(args: &Args<'_>, attrs: &Value) -> Result<HighlightUpdate, EventError> {
    let map = attrs.as_object().ok_or_else(|| args.invalid("rgb_attr"))?;
    let color = |key: &str| {
        map.get(key)
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .map(Rgb::from_packed)
    };

    let mut update = HighlightUpdate {
        foreground: color("foreground"),
        background: color("background"),
        special: color("special"),
        ..HighlightUpdate::default()
    };
    for (key, flag) in FLAG_NAMES {
        match map.get(key).and_then(Value::as_bool) {
            Some(true) => update.set.insert(flag),
            Some(false) => update.unset.insert(flag),
            None => {}
        }
    }
    Ok(update)
}

fn line_cells(args: &Args<'_>, cells: &Value) -> Result<Vec<LineCell>, EventError> {
    let cells = cells.as_array().ok_or_else(|| args.invalid("cells"))?;
    cells
        .iter()
        .map(|cell| {
            let parts = cell.as_array().ok_or_else(|| args.invalid("cells"))?;
            let text = parts
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| args.invalid("cells"))?;
            let number = |index: usize| -> Result<Option<u64>, EventError> {
                match parts.get(index) {
                    None => Ok(None),
                    Some(value) => value.as_u64().map(Some).ok_or_else(|| args.invalid("cells")),
                }
            };
            Ok(LineCell {
                text: text.to_string(),
                hl_id: number(1)?,
                repeat: number(2)?,
            })
        })
        .collect()
}

fn mode_infos(args: &Args<'_>, modes: &Value) -> Result<Vec<ModeInfo>, EventError> {
    let modes = modes.as_array().ok_or_else(|| args.invalid("mode_info"))?;
    modes
        .iter()
        .map(|mode| {
            let map = mode.as_object().ok_or_else(|| args.invalid("mode_info"))?;
            let shape = map
                .get("cursor_shape")
                .and_then(Value::as_str)
                .map(CursorShape::from_name)
                .unwrap_or_default();
            let hl_id = match map.get("attr_id").and_then(Value::as_u64) {
                Some(id) => u16::try_from(id).map_err(|_| args.invalid("attr_id"))?,
                None => 0,
            };
            let cell_percentage = map
                .get("cell_percentage")
                .and_then(Value::as_f64)
                .map(|p| (p / 100.0) as f32)
                .unwrap_or(0.0);
            Ok(ModeInfo {
                shape,
                hl_id,
                cell_percentage,
            })
        })
        .collect()
}
