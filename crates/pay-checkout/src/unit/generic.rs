use super::MethodBehavior;

/// Tokenizer-only method without widgets or a redirect policy of its own
pub struct GenericBehavior;

impl MethodBehavior for GenericBehavior {}
