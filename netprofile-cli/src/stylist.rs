use console::{style, StyledObject};

pub fn network<T>(name: T) -> StyledObject<T> {
    style(name).bold().green()
}

pub fn label<T>(name: T) -> StyledObject<T> {
    style(name).cyan().dim()
}

pub fn warning<T>(msg: T) -> StyledObject<T> {
    style(msg).yellow().bold()
}

pub fn failure<T>(msg: T) -> StyledObject<T> {
    style(msg).red().bold()
}
