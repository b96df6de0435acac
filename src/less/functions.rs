// src/less/functions.rs

//! Built-in Less functions. Anything not handled here is emitted as a
//! plain CSS function call.

use super::color::Color;
use super::error::{LessErrorKind, ValueError};
use super::value::{Number, Value};

type Result<T> = std::result::Result<T, ValueError>;

pub fn call(name: &str, args: Vec<Value>) -> Result<Value> {
    let lower = name.to_ascii_lowercase();
    let result = match lower.as_str() {
        "percentage" => {
            let n = number(&args, 0, name)?;
            Some(Value::Number(Number::new(n.value * 100.0, "%")))
        }
        "round" => {
            let n = number(&args, 0, name)?;
            let places = args.get(1).and_then(Value::as_number).map_or(0.0, |p| p.value);
            let factor = 10f64.powf(places);
            Some(Value::Number(Number::new(
                (n.value * factor).round() / factor,
                n.unit.clone(),
            )))
        }
        "ceil" => Some(map_number(&args, name, f64::ceil)?),
        "floor" => Some(map_number(&args, name, f64::floor)?),
        "abs" => Some(map_number(&args, name, f64::abs)?),
        "sqrt" => Some(map_number(&args, name, f64::sqrt)?),
        "min" | "max" => extremum(&args, lower == "max"),
        "unit" => {
            let n = number(&args, 0, name)?;
            let unit = args.get(1).map(Value::unquoted).unwrap_or_default();
            Some(Value::Number(Number::new(n.value, unit)))
        }
        "e" => Some(Value::Keyword(string(&args, 0, name)?)),
        "escape" => Some(Value::Keyword(escape(&string(&args, 0, name)?))),
        "rgb" | "rgba" => rgba(&args)?,
        "hsl" | "hsla" => hsla(&args)?,
        "lighten" => Some(adjust_hsl(&args, name, |h, s, l, amount| (h, s, l + amount))?),
        "darken" => Some(adjust_hsl(&args, name, |h, s, l, amount| (h, s, l - amount))?),
        "saturate" => Some(adjust_hsl(&args, name, |h, s, l, amount| (h, s + amount, l))?),
        "desaturate" => Some(adjust_hsl(&args, name, |h, s, l, amount| (h, s - amount, l))?),
        "greyscale" => {
            let c = color(&args, 0, name)?;
            let (h, _, l) = c.to_hsl();
            Some(Value::Color(Color::from_hsla(h, 0.0, l, c.a)))
        }
        "spin" => {
            let c = color(&args, 0, name)?;
            let degrees = number(&args, 1, name)?.value;
            let (h, s, l) = c.to_hsl();
            Some(Value::Color(Color::from_hsla(h + degrees, s, l, c.a)))
        }
        "fade" => Some(adjust_alpha(&args, name, |_, amount| amount)?),
        "fadein" => Some(adjust_alpha(&args, name, |a, amount| a + amount)?),
        "fadeout" => Some(adjust_alpha(&args, name, |a, amount| a - amount)?),
        "mix" => {
            let first = color(&args, 0, name)?;
            let second = color(&args, 1, name)?;
            let weight = args
                .get(2)
                .and_then(Value::as_number)
                .map_or(0.5, |w| w.value / 100.0);
            Some(Value::Color(first.mix(&second, weight)))
        }
        "contrast" => {
            let c = color(&args, 0, name)?;
            let dark = args
                .get(1)
                .and_then(Value::as_color)
                .unwrap_or_else(|| Color::rgba(0.0, 0.0, 0.0, 1.0));
            let light = args
                .get(2)
                .and_then(Value::as_color)
                .unwrap_or_else(|| Color::rgba(255.0, 255.0, 255.0, 1.0));
            let (dark, light) = if dark.luma() > light.luma() {
                (light, dark)
            } else {
                (dark, light)
            };
            let threshold = args.get(3).and_then(Value::as_number).map_or(0.43, |n| {
                if n.unit == "%" { n.value / 100.0 } else { n.value }
            });
            let pick = if c.a * c.luma() < threshold { light } else { dark };
            Some(Value::Color(pick))
        }
        "red" | "green" | "blue" | "alpha" | "hue" | "saturation" | "lightness" => {
            channel(&lower, &args)
        }
        "iscolor" => Some(Value::boolean(args.first().and_then(Value::as_color).is_some())),
        "isnumber" => Some(Value::boolean(matches!(args.first(), Some(Value::Number(_))))),
        "isstring" => Some(Value::boolean(matches!(args.first(), Some(Value::Quoted { .. })))),
        "iskeyword" => Some(Value::boolean(matches!(
            args.first(),
            Some(Value::Keyword(k)) if Color::from_name(k).is_none()
        ))),
        "isurl" => Some(Value::boolean(matches!(args.first(), Some(Value::Url(_))))),
        "ispixel" => Some(Value::boolean(has_unit(&args, "px"))),
        "ispercentage" => Some(Value::boolean(has_unit(&args, "%"))),
        "isem" => Some(Value::boolean(has_unit(&args, "em"))),
        "isunit" => {
            let unit = args.get(1).map(Value::unquoted).unwrap_or_default();
            Some(Value::boolean(has_unit(&args, &unit)))
        }
        _ => None,
    };

    Ok(result.unwrap_or_else(|| Value::Call {
        name: name.to_string(),
        args,
    }))
}

fn argument_error(name: &str, message: impl std::fmt::Display) -> ValueError {
    ValueError::new(
        LessErrorKind::Argument,
        format!("error evaluating function `{name}`: {message}"),
    )
}

fn number<'v>(args: &'v [Value], index: usize, name: &str) -> Result<&'v Number> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(n),
        Some(other) => Err(argument_error(name, format!("argument `{other}` must be a number"))),
        None => Err(argument_error(name, format!("expected argument {}", index + 1))),
    }
}

fn color(args: &[Value], index: usize, name: &str) -> Result<Color> {
    match args.get(index) {
        Some(value) => value
            .as_color()
            .ok_or_else(|| argument_error(name, format!("argument `{value}` must be a color"))),
        None => Err(argument_error(name, format!("expected argument {}", index + 1))),
    }
}

fn string(args: &[Value], index: usize, name: &str) -> Result<String> {
    args.get(index)
        .map(Value::unquoted)
        .ok_or_else(|| argument_error(name, format!("expected argument {}", index + 1)))
}

/// Amount argument of color functions: `10%` and `10` both mean a tenth.
fn amount(args: &[Value], index: usize, name: &str) -> Result<f64> {
    Ok(number(args, index, name)?.value / 100.0)
}

fn map_number(args: &[Value], name: &str, f: fn(f64) -> f64) -> Result<Value> {
    let n = number(args, 0, name)?;
    Ok(Value::Number(Number::new(f(n.value), n.unit.clone())))
}

fn has_unit(args: &[Value], unit: &str) -> bool {
    matches!(args.first(), Some(Value::Number(n)) if n.unit == unit)
}

fn extremum(args: &[Value], max: bool) -> Option<Value> {
    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        numbers.push(arg.as_number()?);
    }
    let first = numbers.first()?;
    let unit = numbers
        .iter()
        .find(|n| !n.unit.is_empty())
        .map_or("", |n| n.unit.as_str());
    // Mixed units are left to the browser's own min()/max().
    if numbers.iter().any(|n| !n.unit.is_empty() && n.unit != unit) {
        return None;
    }
    let mut best = first.value;
    for n in &numbers[1..] {
        if (max && n.value > best) || (!max && n.value < best) {
            best = n.value;
        }
    }
    Some(Value::Number(Number::new(best, unit)))
}

fn channel_value(value: &Value, scale: f64) -> Option<f64> {
    let n = value.as_number()?;
    if n.unit == "%" {
        Some(n.value / 100.0 * scale)
    } else {
        Some(n.value)
    }
}

fn rgba(args: &[Value]) -> Result<Option<Value>> {
    let parsed: Option<Vec<f64>> = match args.len() {
        3 | 4 => args
            .iter()
            .enumerate()
            .map(|(i, v)| channel_value(v, if i == 3 { 1.0 } else { 255.0 }))
            .collect(),
        _ => None,
    };
    let Some(values) = parsed else {
        return Ok(None);
    };
    let alpha = values.get(3).copied().unwrap_or(1.0);
    Ok(Some(Value::Color(Color::rgba(
        values[0], values[1], values[2], alpha,
    ))))
}

fn hsla(args: &[Value]) -> Result<Option<Value>> {
    if !(3..=4).contains(&args.len()) {
        return Ok(None);
    }
    let Some(h) = args[0].as_number().map(|n| n.value) else {
        return Ok(None);
    };
    let (Some(s), Some(l)) = (channel_value(&args[1], 1.0), channel_value(&args[2], 1.0)) else {
        return Ok(None);
    };
    let a = match args.get(3) {
        Some(v) => match channel_value(v, 1.0) {
            Some(a) => a,
            None => return Ok(None),
        },
        None => 1.0,
    };
    Ok(Some(Value::Color(Color::from_hsla(h, s, l, a))))
}

fn adjust_hsl(
    args: &[Value],
    name: &str,
    f: impl Fn(f64, f64, f64, f64) -> (f64, f64, f64),
) -> Result<Value> {
    let c = color(args, 0, name)?;
    let amount = amount(args, 1, name)?;
    let (h, s, l) = c.to_hsl();
    let (h, s, l) = f(h, s, l, amount);
    Ok(Value::Color(Color::from_hsla(h, s, l, c.a)))
}

fn adjust_alpha(args: &[Value], name: &str, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
    let c = color(args, 0, name)?;
    let amount = amount(args, 1, name)?;
    let mut out = Color::rgba(c.r, c.g, c.b, f(c.a, amount).clamp(0.0, 1.0));
    out.original = None;
    Ok(Value::Color(out))
}

fn channel(name: &str, args: &[Value]) -> Option<Value> {
    let c = args.first()?.as_color()?;
    let (h, s, l) = c.to_hsl();
    let value = match name {
        "red" => Number::new(c.r, ""),
        "green" => Number::new(c.g, ""),
        "blue" => Number::new(c.b, ""),
        "alpha" => Number::new(c.a, ""),
        "hue" => Number::new(h.round(), ""),
        "saturation" => Number::new((s * 100.0).round(), "%"),
        _ => Number::new((l * 100.0).round(), "%"),
    };
    Some(Value::Number(value))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' ' | '#' | '^' | '(' | ')' | '{' | '}' | '|' | ':' | '>' | '<' | ';' | ']' | '['
            | '=' => out.push_str(&format!("%{:02X}", c as u32)),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(v: f64) -> Value {
        Value::Number(Number::new(v, "px"))
    }

    fn hex(text: &str) -> Value {
        Value::Color(Color::from_hex(text).unwrap())
    }

    fn pct(v: f64) -> Value {
        Value::Number(Number::new(v, "%"))
    }

    #[test]
    fn percentage_and_rounding() {
        let out = call("percentage", vec![Value::Number(Number::new(0.5, ""))]).unwrap();
        assert_eq!(out.to_string(), "50%");
        let out = call("round", vec![px(1.67), Value::Number(Number::new(1.0, ""))]).unwrap();
        assert_eq!(out.to_string(), "1.7px");
    }

    #[test]
    fn lighten_and_darken_move_lightness() {
        assert_eq!(call("darken", vec![hex("#ffffff"), pct(100.0)]).unwrap().to_string(), "#000000");
        assert_eq!(call("lighten", vec![hex("#000000"), pct(50.0)]).unwrap().to_string(), "#808080");
    }

    #[test]
    fn fade_sets_alpha() {
        let out = call("fade", vec![hex("#000"), pct(50.0)]).unwrap();
        assert_eq!(out.to_string(), "rgba(0, 0, 0, 0.5)");
    }

    #[test]
    fn mix_defaults_to_even_weight() {
        let out = call("mix", vec![hex("#ff0000"), hex("#0000ff")]).unwrap();
        assert_eq!(out.to_string(), "#800080");
    }

    #[test]
    fn rgba_with_literal_channels_becomes_a_color() {
        let args = vec![
            Value::Number(Number::new(255.0, "")),
            Value::Number(Number::new(0.0, "")),
            Value::Number(Number::new(0.0, "")),
        ];
        assert_eq!(call("rgb", args).unwrap().to_string(), "#ff0000");
    }

    #[test]
    fn unknown_functions_pass_through() {
        let out = call("translate", vec![px(1.0), px(2.0)]).unwrap();
        assert_eq!(out.to_string(), "translate(1px, 2px)");
    }

    #[test]
    fn min_with_mixed_units_is_left_alone() {
        let out = call("min", vec![px(10.0), Value::Number(Number::new(5.0, "vw"))]).unwrap();
        assert_eq!(out.to_string(), "min(10px, 5vw)");
    }

    #[test]
    fn color_functions_reject_non_colors() {
        let err = call("darken", vec![px(1.0), pct(10.0)]).unwrap_err();
        assert_eq!(err.kind, LessErrorKind::Argument);
    }
}
