use crate::AuthContext;

#[derive(Debug, Clone)]
pub enum GuardError {
    Forbidden { required: Vec<String> },
}

impl GuardError {
    pub fn message(&self) -> String {
        match self {
            GuardError::Forbidden { required } => {
                if required.is_empty() {
                    "Insufficient role".to_string()
                } else {
                    format!("Insufficient role. Required one of: {}", required.join(", "))
                }
            }
        }
    }
}

pub fn ensure_role(auth: &AuthContext, allowed: &[&str]) -> Result<(), GuardError> {
    if allowed.is_empty() {
        return Ok(());
    }

    let has_role = auth
        .claims
        .roles
        .iter()
        .any(|role| allowed.iter().any(|required| role == required));

    if has_role {
        Ok(())
    } else {
        Err(GuardError::Forbidden {
            required: allowed.iter().map(|value| value.to_string()).collect(),
        })
    }
}
