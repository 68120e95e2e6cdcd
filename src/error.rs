use std::fmt::Display;

#[derive(Debug)]
pub enum TawssError {
    Input(String),
    Case(String),
    Geometry(String),
    Output(String),
}

impl Display for TawssError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (err_name, value) = match self {
            TawssError::Input(v) => ("Input", v),
            TawssError::Case(v) => ("Case", v),
            TawssError::Geometry(v) => ("Geometry", v),
            TawssError::Output(v) => ("Output", v),
        };

        write!(f, "{} error: {}", err_name, value)
    }
}
