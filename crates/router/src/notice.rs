//! User-facing texts the router sends on its own behalf.

pub fn help_pointer(prefix: &str) -> String {
    format!("Type {prefix}help to see all available commands.")
}

pub fn not_installed(name: &str, prefix: &str) -> String {
    if name.is_empty() {
        return help_pointer(prefix);
    }
    format!("The command \"{name}\" is not installed. Type {prefix}help to see all available commands.")
}

pub fn wrong_convention(name: &str) -> String {
    format!("\"{name}\" is used without a prefix. Just type: {name}")
}

pub fn command_failed(name: &str) -> String {
    format!("Something went wrong while running \"{name}\". Please try again later.")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn not_installed_names_command_and_help() {
        let text = not_installed("doesnotexist", "#");
        assert!(text.contains("doesnotexist"));
        assert!(text.contains("#help"));
    }

    #[test]
    fn empty_name_falls_back_to_help_pointer() {
        assert_eq!(not_installed("", "!"), help_pointer("!"));
    }
}
