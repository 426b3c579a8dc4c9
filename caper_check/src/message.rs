define_msg! { pub UnknownName { name: String }:
    _ => "Unknown name `{name}`",
}

define_msg! { pub NotALocation { name: String }:
    _ => "`{name}` is not a location variable",
}

define_msg! { pub NotAProtocol { ty: String }:
    _ => "`{ty}` is not a protocol",
}

define_msg! { pub DuplicateDefinition { name: String }:
    _ => "A type named `{name}` is already defined",
}

define_msg! { pub DuplicateLabel { label: String }:
    _ => "The label `{label}` appears more than once",
}

define_msg! { pub ArityMismatch { name: String, expected: usize, actual: usize }:
    _ => "`{name}` takes {expected} argument(s) but was given {actual}",
}

define_msg! { pub ArgumentKindMismatch { name: String, index: usize }:
    _ => "Argument {index} to `{name}` has the wrong kind \
          (locations are lowercase, types uppercase)",
}

define_msg! { pub BottomDefinition { name: String }:
    _ => "The definition of `{name}` never reaches a type and denotes bottom",
}

define_msg! { pub UnexpectedResult { op: String, expected: bool, actual: bool }:
    _ => "Unexpected Result: `{op}` was expected to be {expected} but was {actual}",
}
