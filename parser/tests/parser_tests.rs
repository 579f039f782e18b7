#[cfg(test)]
mod parser_tests {
  use std::sync::Arc;

  use dynexpr_parser::args::Parameter;
  use dynexpr_parser::ast::{CallTarget, CastKind, ExprKind};
  use dynexpr_parser::{error::ParseError, parse};
  use dynexpr_reflect::{
    AssignmentPolicy, Conversion, DynValue, ExtensionMethod, HostCallable, HostInvocationError,
    HostTypeInfo, MemberInfo, MethodSignature, OverloadError, PrimitiveKind, PrimitiveType,
    ParserSettings, RegistryOptions, TypeHandle, Value,
  };

  #[derive(Debug)]
  struct Widget;

  impl HostTypeInfo for Widget {
    fn type_name(&self) -> &str {
      "Widget"
    }

    fn members(&self, name: &str, case_sensitive: bool) -> Vec<MemberInfo> {
      let matches = |candidate: &str| {
        if case_sensitive {
          candidate == name
        } else {
          candidate.eq_ignore_ascii_case(name)
        }
      };

      let mut found = Vec::new();
      if matches("Label") {
        found.push(MemberInfo::Property {
          name: "Label".to_string(),
          ty: PrimitiveType::handle(PrimitiveKind::Str),
        });
      }
      if matches("Ambiguous") {
        found.push(MemberInfo::Property {
          name: "Ambiguous".to_string(),
          ty: PrimitiveType::handle(PrimitiveKind::I32),
        });
        found.push(MemberInfo::Field {
          name: "Ambiguous".to_string(),
          ty: PrimitiveType::handle(PrimitiveKind::I32),
        });
      }
      found
    }

    fn resolve_method(&self, name: &str, case_sensitive: bool, argument_types: &[TypeHandle]) -> Result<MethodSignature, OverloadError> {
      let matches = if case_sensitive { name == "Greet" } else { name.eq_ignore_ascii_case("Greet") };
      if matches && argument_types.is_empty() {
        return Ok(MethodSignature {
          name: "Greet".to_string(),
          parameters: Vec::new(),
          return_type: PrimitiveType::handle(PrimitiveKind::Str),
          is_variadic: false,
        });
      }
      Err(OverloadError::NoApplicableOverload)
    }

    fn assignability(&self, target: &TypeHandle) -> Option<Conversion> {
      if target.type_name() == "Widget" || target.type_name() == "object" {
        Some(Conversion::Implicit)
      } else {
        None
      }
    }

    fn extension_methods(&self) -> Vec<ExtensionMethod> {
      let implementation: HostCallable = Arc::new(|_receiver, _arguments| Ok(Value::str("extended").into_dyn()));
      vec![ExtensionMethod {
        name: "Describe".to_string(),
        signature: MethodSignature {
          name: "Describe".to_string(),
          parameters: vec![widget_type()],
          return_type: PrimitiveType::handle(PrimitiveKind::Str),
          is_variadic: false,
        },
        implementation,
      }]
    }

    fn get_member(&self, _receiver: &DynValue, member: &MemberInfo) -> Result<DynValue, HostInvocationError> {
      Err(HostInvocationError::new(format!("widget has no stored member `{}`", member.name())))
    }

    fn invoke_method(&self, _receiver: &DynValue, signature: &MethodSignature, _arguments: &[DynValue]) -> Result<DynValue, HostInvocationError> {
      Err(HostInvocationError::new(format!("widget cannot invoke `{}`", signature.name)))
    }
  }

  fn widget_type() -> TypeHandle {
    Arc::new(Widget)
  }

  fn settings_with_widget() -> ParserSettings {
    let mut settings = ParserSettings::new(RegistryOptions::default());
    settings.register_type("Widget", widget_type()).unwrap();
    settings
  }

  fn int_param(name: &str) -> Parameter {
    Parameter::new(name, PrimitiveType::handle(PrimitiveKind::I32))
  }

  #[test]
  fn arithmetic_precedence_binds_multiplication_tighter_than_addition() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let (expr, _) = parse("1 + 2 * 3", &settings, None, &[]).unwrap();

    let ExprKind::Binary { lhs, rhs, .. } = &expr.kind else { panic!("expected a top-level binary node") };
    assert!(matches!(lhs.kind, ExprKind::Constant(_)));
    assert!(matches!(rhs.kind, ExprKind::Binary { .. }));
  }

  #[test]
  fn relational_and_equality_bind_looser_than_additive() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let (expr, _) = parse("1 + 2 == 3", &settings, None, &[]).unwrap();

    let ExprKind::Binary { lhs, .. } = &expr.kind else { panic!("expected a top-level equality node") };
    assert!(matches!(lhs.kind, ExprKind::Binary { .. }));
  }

  #[test]
  fn conditional_operator_parses_both_branches() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let (expr, _) = parse("true ? 1 : 2", &settings, None, &[]).unwrap();
    assert!(matches!(expr.kind, ExprKind::Conditional { .. }));
  }

  #[test]
  fn conditional_branches_with_incompatible_types_is_a_parse_error() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let err = parse("true ? 1 : \"x\"", &settings, None, &[]).unwrap_err();
    assert!(matches!(err, ParseError { .. }));
  }

  #[test]
  fn is_operator_produces_a_type_test_cast_node() {
    let settings = settings_with_widget();
    let params = [Parameter::new("w", widget_type())];
    let (expr, _) = parse("w is Widget", &settings, None, &params).unwrap();

    let ExprKind::Cast { kind, .. } = &expr.kind else { panic!("expected a cast node") };
    assert_eq!(*kind, CastKind::TypeTest);
  }

  #[test]
  fn as_operator_produces_an_implicit_convert_cast_node() {
    let settings = settings_with_widget();
    let params = [Parameter::new("w", widget_type())];
    let (expr, _) = parse("w as object", &settings, None, &params).unwrap();

    let ExprKind::Cast { kind, .. } = &expr.kind else { panic!("expected a cast node") };
    assert_eq!(*kind, CastKind::Convert { explicit: false });
  }

  #[test]
  fn parenthesised_known_type_before_a_unary_operand_is_a_cast() {
    let settings = settings_with_widget();
    let params = [Parameter::new("w", widget_type())];
    let (expr, _) = parse("(object)w", &settings, None, &params).unwrap();

    let ExprKind::Cast { kind, target_type, .. } = &expr.kind else { panic!("expected a cast node") };
    assert_eq!(*kind, CastKind::Convert { explicit: true });
    assert_eq!(target_type.type_name(), "object");
  }

  #[test]
  fn parenthesised_expression_without_a_known_type_is_a_grouping() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let (expr, _) = parse("(1 + 2) * 3", &settings, None, &[]).unwrap();
    assert!(matches!(expr.kind, ExprKind::Binary { .. }));
  }

  #[test]
  fn static_member_resolves_before_any_dynamic_fallback() {
    let settings = settings_with_widget();
    let params = [Parameter::new("w", widget_type())];
    let (expr, _) = parse("w.Label", &settings, None, &params).unwrap();

    let ExprKind::Member { member, .. } = &expr.kind else { panic!("expected a static member node") };
    assert_eq!(member.name(), "Label");
  }

  #[test]
  fn ambiguous_static_member_is_a_parse_error_not_a_dynamic_fallback() {
    let settings = settings_with_widget();
    let params = [Parameter::new("w", widget_type())];
    let err = parse("w.Ambiguous", &settings, None, &params).unwrap_err();
    assert!(err.diagnostic.message.contains("ambiguous"));
  }

  #[test]
  fn unknown_member_on_a_non_dynamic_type_is_a_parse_error() {
    let settings = settings_with_widget();
    let params = [Parameter::new("w", widget_type())];
    let err = parse("w.Missing", &settings, None, &params).unwrap_err();
    assert!(err.diagnostic.message.contains("no member"));
  }

  #[test]
  fn instance_method_resolves_before_an_extension_method_of_the_same_receiver() {
    let settings = settings_with_widget();
    let params = [Parameter::new("w", widget_type())];
    let (expr, _) = parse("w.Greet()", &settings, None, &params).unwrap();

    let ExprKind::Call { target, .. } = &expr.kind else { panic!("expected a call node") };
    assert!(matches!(target, CallTarget::Method(signature) if signature.name == "Greet"));
  }

  #[test]
  fn extension_method_resolves_when_no_instance_method_applies() {
    let settings = settings_with_widget();
    let params = [Parameter::new("w", widget_type())];
    let (expr, _) = parse("w.Describe()", &settings, None, &params).unwrap();

    let ExprKind::Call { target, .. } = &expr.kind else { panic!("expected a call node") };
    assert!(matches!(target, CallTarget::Extension(extension) if extension.name == "Describe"));
  }

  #[test]
  fn call_to_an_unresolvable_method_is_a_parse_error() {
    let settings = settings_with_widget();
    let params = [Parameter::new("w", widget_type())];
    let err = parse("w.Vanish()", &settings, None, &params).unwrap_err();
    assert!(err.diagnostic.message.contains("no method"));
  }

  #[test]
  fn host_type_compared_against_null_binds_as_reference_equality() {
    let settings = settings_with_widget();
    let params = [Parameter::new("w", widget_type())];
    let (expr, _) = parse("w == null", &settings, None, &params).unwrap();
    assert!(matches!(expr.kind, ExprKind::Binary { .. }));

    let (expr, _) = parse("null != w", &settings, None, &params).unwrap();
    assert!(matches!(expr.kind, ExprKind::Binary { .. }));
  }

  #[test]
  fn primitive_compared_against_null_is_still_a_parse_error() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let err = parse("1 == null", &settings, None, &[]).unwrap_err();
    assert!(err.diagnostic.message.contains("cannot compare"));
  }

  #[test]
  fn truncated_input_reports_unexpected_eof_rather_than_the_wrong_token_code() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let err = parse("(1 + 2", &settings, None, &[]).unwrap_err();
    assert!(err.diagnostic.message.contains("unexpected end of input"));
  }

  #[test]
  fn default_of_a_primitive_type_is_its_zero_value() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let (expr, _) = parse("default(int)", &settings, None, &[]).unwrap();
    let ExprKind::Constant(value) = &expr.kind else { panic!("expected a constant node") };
    assert!(matches!(Value::from_dyn(value), Some(Value::I32(0))));
  }

  #[test]
  fn typeof_desugars_to_a_synthetic_type_member_access() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let (expr, _) = parse("typeof(int)", &settings, None, &[]).unwrap();
    let ExprKind::Member { receiver, member } = &expr.kind else { panic!("expected a member node") };
    assert_eq!(member.name(), "$type");
    assert!(matches!(receiver.kind, ExprKind::TypeRef(_)));
  }

  #[test]
  fn single_parameter_lambda_binds_its_parameter_name_in_scope() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let (expr, _) = parse("x => x + 1", &settings, None, &[]).unwrap();
    let ExprKind::Lambda(lambda) = &expr.kind else { panic!("expected a lambda node") };
    assert_eq!(lambda.parameters.len(), 1);
    assert_eq!(lambda.parameters[0].0, "x");
  }

  #[test]
  fn multi_parameter_lambda_parses_a_parenthesised_parameter_list() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let (expr, _) = parse("(a, b) => a + b", &settings, None, &[]).unwrap();
    let ExprKind::Lambda(lambda) = &expr.kind else { panic!("expected a lambda node") };
    assert_eq!(lambda.parameters.iter().map(|p| p.0.clone()).collect::<Vec<_>>(), vec!["a", "b"]);
  }

  #[test]
  fn lambda_parameter_shadows_a_declared_parameter_of_the_same_name() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let params = [int_param("x")];
    let (expr, args) = parse("x => x", &settings, None, &params).unwrap();
    let ExprKind::Lambda(lambda) = &expr.kind else { panic!("expected a lambda node") };
    assert!(matches!(lambda.body.kind, ExprKind::LambdaParam(_)));
    assert!(args.used_parameters().is_empty());
  }

  #[test]
  fn declared_parameter_reference_is_recorded_as_used() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let params = [int_param("x"), int_param("y")];
    let (_, args) = parse("x + 1", &settings, None, &params).unwrap();
    let used: Vec<&str> = args.used_parameters().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(used, vec!["x"]);
  }

  #[test]
  fn referencing_a_registered_type_name_marks_it_used() {
    let settings = settings_with_widget();
    let (_, args) = parse("typeof(Widget)", &settings, None, &[]).unwrap();
    assert!(args.used_types().contains("Widget"));
  }

  #[test]
  fn assignment_is_rejected_unless_the_policy_permits_it() {
    let mut settings = ParserSettings::new(RegistryOptions::default());
    let err = {
      let params = [int_param("x")];
      parse("x = 1", &settings, None, &params).unwrap_err()
    };
    assert!(err.diagnostic.message.to_lowercase().contains("assign"));

    settings.set_assignment_policy(AssignmentPolicy::EqualOnly);
    let params = [int_param("x")];
    let err = parse("x = 1", &settings, None, &params).unwrap_err();
    assert!(err.diagnostic.message.contains("declared parameter"));
  }

  #[test]
  fn assignment_to_a_constant_identifier_is_a_parse_error() {
    let mut settings = ParserSettings::new(RegistryOptions::default());
    settings.set_assignment_policy(AssignmentPolicy::EqualOnly);
    settings
      .register_identifier("pi", PrimitiveType::handle(PrimitiveKind::F64), dynexpr_reflect::IdentifierBinding::Constant(Value::F64(3.14).into_dyn()))
      .unwrap();

    let err = parse("pi = 1.0", &settings, None, &[]).unwrap_err();
    assert!(err.diagnostic.message.contains("constant"));
  }

  #[test]
  fn assignment_to_a_variable_identifier_is_accepted() {
    let mut settings = ParserSettings::new(RegistryOptions::default());
    settings.set_assignment_policy(AssignmentPolicy::EqualOnly);
    let cell = std::sync::Arc::new(std::sync::RwLock::new(Value::I32(0).into_dyn()));
    settings
      .register_identifier("counter", PrimitiveType::handle(PrimitiveKind::I32), dynexpr_reflect::IdentifierBinding::Variable(cell))
      .unwrap();

    let (expr, _) = parse("counter = 5", &settings, None, &[]).unwrap();
    assert!(matches!(expr.kind, ExprKind::Assign { .. }));
  }

  #[test]
  fn unknown_bare_identifier_is_a_parse_error() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let err = parse("mystery", &settings, None, &[]).unwrap_err();
    assert!(err.diagnostic.message.contains("unknown identifier"));
  }

  #[test]
  fn trailing_tokens_after_a_complete_expression_are_rejected() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let err = parse("1 + 2 3", &settings, None, &[]).unwrap_err();
    assert!(err.diagnostic.message.contains("trailing"));
  }

  #[test]
  fn expected_type_inserts_an_implicit_conversion_at_the_root() {
    let settings = ParserSettings::new(RegistryOptions::default());
    let (expr, _) = parse("1", &settings, Some(PrimitiveType::handle(PrimitiveKind::I64)), &[]).unwrap();
    let ExprKind::Cast { kind, target_type, .. } = &expr.kind else { panic!("expected an implicit widening cast") };
    assert_eq!(*kind, CastKind::Convert { explicit: false });
    assert_eq!(target_type.type_name(), "long");
  }

  #[test]
  fn indexer_access_resolves_against_get_item_and_set_item_conventions() {
    #[derive(Debug)]
    struct IndexedBag;

    impl HostTypeInfo for IndexedBag {
      fn type_name(&self) -> &str {
        "IndexedBag"
      }
      fn members(&self, _name: &str, _case_sensitive: bool) -> Vec<MemberInfo> {
        Vec::new()
      }
      fn resolve_method(&self, name: &str, _case_sensitive: bool, argument_types: &[TypeHandle]) -> Result<MethodSignature, OverloadError> {
        let int_ty = PrimitiveType::handle(PrimitiveKind::I32);
        match (name, argument_types.len()) {
          ("get_Item", 1) => Ok(MethodSignature {
            name: "get_Item".to_string(),
            parameters: vec![int_ty.clone()],
            return_type: int_ty,
            is_variadic: false,
          }),
          ("set_Item", 2) => Ok(MethodSignature {
            name: "set_Item".to_string(),
            parameters: vec![int_ty.clone(), int_ty.clone()],
            return_type: PrimitiveType::handle(PrimitiveKind::Object),
            is_variadic: false,
          }),
          _ => Err(OverloadError::NoApplicableOverload),
        }
      }
      fn assignability(&self, _target: &TypeHandle) -> Option<Conversion> {
        None
      }
      fn get_member(&self, _receiver: &DynValue, member: &MemberInfo) -> Result<DynValue, HostInvocationError> {
        Err(HostInvocationError::new(format!("no member `{}`", member.name())))
      }
      fn invoke_method(&self, _receiver: &DynValue, signature: &MethodSignature, _arguments: &[DynValue]) -> Result<DynValue, HostInvocationError> {
        Err(HostInvocationError::new(format!("cannot invoke `{}`", signature.name)))
      }
    }

    let mut settings = ParserSettings::new(RegistryOptions::default());
    settings.register_type("IndexedBag", Arc::new(IndexedBag)).unwrap();
    let params = [Parameter::new("bag", Arc::new(IndexedBag))];
    let (expr, _) = parse("bag[0]", &settings, None, &params).unwrap();

    let ExprKind::Call { target, .. } = &expr.kind else { panic!("expected a call node") };
    assert!(matches!(target, CallTarget::Indexer { set: Some(_), .. }));
  }
}
