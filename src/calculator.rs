use crate::error::ValidationError;

/// Shown after a failed operation. Only [`Key::Clear`] leaves this state.
pub const ERROR_DISPLAY: &str = "Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '−',
            Operator::Multiply => '×',
            Operator::Divide => '÷',
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, ValidationError> {
        let value = match self {
            Operator::Add => lhs + rhs,
            Operator::Subtract => lhs - rhs,
            Operator::Multiply => lhs * rhs,
            Operator::Divide => {
                if rhs == 0.0 {
                    return Err(ValidationError::DivisionByZero);
                }
                lhs / rhs
            }
        };
        if !value.is_finite() {
            return Err(ValidationError::OutOfRange);
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    Decimal,
    Operator(Operator),
    Equals,
    Clear,
    ToggleSign,
    Percent,
}

impl Key {
    /// Parses a keypad label. The typographic operator glyphs and their ASCII forms
    /// (`-`, `*`, `/`) are accepted.
    pub fn from_label(label: &str) -> Option<Key> {
        let key = match label.trim() {
            "." => Key::Decimal,
            "+" => Key::Operator(Operator::Add),
            "-" | "−" => Key::Operator(Operator::Subtract),
            "×" | "*" => Key::Operator(Operator::Multiply),
            "÷" | "/" => Key::Operator(Operator::Divide),
            "=" => Key::Equals,
            "C" => Key::Clear,
            "±" => Key::ToggleSign,
            "%" => Key::Percent,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Digit(c.to_digit(10)? as u8),
                    _ => return None,
                }
            }
        };
        Some(key)
    }
}

#[derive(Debug, Clone)]
pub struct Calculator {
    display: String,
    previous: Option<f64>,
    operator: Option<Operator>,
    waiting_for_operand: bool,
    error: bool,
}

impl Default for Calculator {
    fn default() -> Self {
        Self {
            display: "0".to_string(),
            previous: None,
            operator: None,
            waiting_for_operand: false,
            error: false,
        }
    }
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn pending_operator(&self) -> Option<Operator> {
        self.operator
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn press(&mut self, key: Key) -> Result<(), ValidationError> {
        if self.error && key != Key::Clear {
            return Err(ValidationError::ClearRequired);
        }
        match key {
            Key::Digit(digit) => self.input_digit(digit),
            Key::Decimal => self.input_decimal(),
            Key::Operator(next) => return self.select_operator(next),
            Key::Equals => return self.equals(),
            Key::Clear => *self = Self::default(),
            Key::ToggleSign => self.toggle_sign(),
            Key::Percent => {
                let value = self.current_value() / 100.0;
                self.display = format_number(value);
            }
        }
        Ok(())
    }

    /// Feeds a sequence of keypad labels; unknown labels are skipped.
    pub fn press_labels<'a>(
        &mut self,
        labels: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ValidationError> {
        for label in labels {
            match Key::from_label(label) {
                Some(key) => self.press(key)?,
                None => log::debug!("ignoring unknown calculator key label={label}"),
            }
        }
        Ok(())
    }

    fn input_digit(&mut self, digit: u8) {
        if digit > 9 {
            return;
        }
        let digit = char::from(b'0' + digit);
        if self.waiting_for_operand {
            self.display = digit.to_string();
            self.waiting_for_operand = false;
        } else if self.display == "0" {
            self.display = digit.to_string();
        } else {
            self.display.push(digit);
        }
    }

    fn input_decimal(&mut self) {
        if self.waiting_for_operand {
            self.display = "0.".to_string();
            self.waiting_for_operand = false;
        } else if !self.display.contains('.') {
            self.display.push('.');
        }
    }

    fn select_operator(&mut self, next: Operator) -> Result<(), ValidationError> {
        // Pressing operators back to back only swaps the pending one.
        if self.waiting_for_operand && self.operator.is_some() {
            self.operator = Some(next);
            return Ok(());
        }
        let input = self.current_value();
        match (self.previous, self.operator) {
            (Some(previous), Some(operator)) => {
                let value = self.evaluate(operator, previous, input)?;
                self.display = format_number(value);
                self.previous = Some(value);
            }
            _ => self.previous = Some(input),
        }
        self.waiting_for_operand = true;
        self.operator = Some(next);
        Ok(())
    }

    fn equals(&mut self) -> Result<(), ValidationError> {
        let (Some(previous), Some(operator)) = (self.previous, self.operator) else {
            return Ok(());
        };
        let value = self.evaluate(operator, previous, self.current_value())?;
        self.display = format_number(value);
        self.previous = None;
        self.operator = None;
        self.waiting_for_operand = true;
        Ok(())
    }

    fn toggle_sign(&mut self) {
        if self.display == "0" {
            return;
        }
        self.display = match self.display.strip_prefix('-') {
            Some(rest) => rest.to_string(),
            None => format!("-{}", self.display),
        };
    }

    fn evaluate(&mut self, operator: Operator, lhs: f64, rhs: f64) -> Result<f64, ValidationError> {
        operator.apply(lhs, rhs).inspect_err(|_| {
            self.display = ERROR_DISPLAY.to_string();
            self.previous = None;
            self.operator = None;
            self.waiting_for_operand = false;
            self.error = true;
        })
    }

    fn current_value(&self) -> f64 {
        self.display.parse().unwrap_or(0.0)
    }
}

fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Avoids showing "-0".
        return "0".to_string();
    }
    value.to_string()
}
