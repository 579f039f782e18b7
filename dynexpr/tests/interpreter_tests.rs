#[cfg(test)]
mod interpreter_tests {
  use std::sync::{Arc, RwLock};

  use dynexpr_reflect::{
    AssignmentPolicy, Conversion, DynValue, DynamicBindingError, DynamicMembers, HostInvocationError,
    HostTypeInfo, IdentifierBinding, MemberInfo, MethodSignature, OverloadError, PrimitiveKind,
    PrimitiveType, TypeHandle, Value,
  };

  use dynexpr::{Interpreter, InterpreterOptions, Parameter};

  fn int_type() -> TypeHandle {
    PrimitiveType::handle(PrimitiveKind::I32)
  }

  fn string_type() -> TypeHandle {
    PrimitiveType::handle(PrimitiveKind::Str)
  }

  /// An ad-hoc property bag: a fixed `RealProperty` alongside a map of
  /// dynamic members a test can populate freely. Exercises both the
  /// static-over-dynamic precedence rule and `DynamicMembers` itself.
  struct Bag {
    dynamic: std::collections::HashMap<String, DynValue>,
  }

  impl DynamicMembers for Bag {
    fn has_member(&self, name: &str) -> bool {
      self.dynamic.contains_key(name)
    }

    fn get_member(&self, name: &str) -> Result<DynValue, DynamicBindingError> {
      self.dynamic.get(name).cloned().ok_or_else(|| {
        DynamicBindingError::new(
          format!("no dynamic member `{}`", name),
          dynexpr::Diagnostic::new(dynexpr::DiagnosticCode::DynamicMemberNotFound, "missing"),
        )
      })
    }

    fn invoke_member(&self, name: &str, arguments: &[DynValue]) -> Result<DynValue, DynamicBindingError> {
      let member = self.get_member(name)?;
      let callable = member.downcast::<StubCallable>().map_err(|_| {
        DynamicBindingError::new(
          format!("dynamic member `{}` is not callable", name),
          dynexpr::Diagnostic::new(dynexpr::DiagnosticCode::DynamicMemberNotFound, "not callable"),
        )
      })?;
      Ok((callable.0)(arguments))
    }

    fn member_names(&self) -> Vec<String> {
      self.dynamic.keys().cloned().collect()
    }
  }

  struct StubCallable(Box<dyn Fn(&[DynValue]) -> DynValue + Send + Sync>);

  #[derive(Debug)]
  struct BagType;

  impl HostTypeInfo for BagType {
    fn type_name(&self) -> &str {
      "Bag"
    }

    fn members(&self, name: &str, _case_sensitive: bool) -> Vec<MemberInfo> {
      if name == "RealProperty" {
        vec![MemberInfo::Property {
          name: "RealProperty".to_string(),
          ty: string_type(),
        }]
      } else {
        Vec::new()
      }
    }

    fn resolve_method(
      &self,
      name: &str,
      _case_sensitive: bool,
      argument_types: &[TypeHandle],
    ) -> Result<MethodSignature, OverloadError> {
      if name == "ToString" && argument_types.is_empty() {
        return Ok(MethodSignature {
          name: "ToString".to_string(),
          parameters: Vec::new(),
          return_type: string_type(),
          is_variadic: false,
        });
      }
      Err(OverloadError::NoApplicableOverload)
    }

    fn assignability(&self, target: &TypeHandle) -> Option<Conversion> {
      if target.type_name() == "Bag" || target.type_name() == "object" {
        Some(Conversion::Implicit)
      } else {
        None
      }
    }

    fn is_dynamic_capable(&self) -> bool {
      true
    }

    fn get_member(&self, receiver: &DynValue, member: &MemberInfo) -> Result<DynValue, HostInvocationError> {
      let bag = receiver
        .downcast_ref::<Bag>()
        .ok_or_else(|| HostInvocationError::new("receiver is not a Bag"))?;
      match member.name() {
        "RealProperty" => bag
          .dynamic
          .get("__real_property__")
          .cloned()
          .ok_or_else(|| HostInvocationError::new("RealProperty not set")),
        other => Err(HostInvocationError::new(format!("no such member `{}`", other))),
      }
    }

    fn invoke_method(
      &self,
      receiver: &DynValue,
      signature: &MethodSignature,
      _arguments: &[DynValue],
    ) -> Result<DynValue, HostInvocationError> {
      let _bag = receiver
        .downcast_ref::<Bag>()
        .ok_or_else(|| HostInvocationError::new("receiver is not a Bag"))?;
      if signature.name == "ToString" {
        return Ok(Value::str("a bag").into_dyn());
      }
      Err(HostInvocationError::new(format!("no such method `{}`", signature.name)))
    }

    fn as_dynamic<'v>(&self, receiver: &'v DynValue) -> Option<&'v dyn DynamicMembers> {
      receiver.downcast_ref::<Bag>().map(|bag| bag as &dyn DynamicMembers)
    }
  }

  fn bag_type() -> TypeHandle {
    Arc::new(BagType)
  }

  fn bag_value(dynamic: Vec<(&str, DynValue)>) -> DynValue {
    Arc::new(Bag {
      dynamic: dynamic.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    })
  }

  fn interpreter_with_bag(bag: DynValue) -> Interpreter {
    let mut interpreter = Interpreter::new(InterpreterOptions::standard());
    interpreter.register_type("Bag", bag_type()).unwrap();
    interpreter
      .register_identifier("dyn", bag_type(), IdentifierBinding::Constant(bag))
      .unwrap();
    interpreter
  }

  #[test]
  fn arithmetic_and_string_concatenation() {
    let interpreter = Interpreter::new(InterpreterOptions::standard());
    let result = interpreter.eval("1 + 2 * 3", None, &[]).unwrap();
    assert!(matches!(result, Value::I32(7)));

    let result = interpreter.eval("\"a\" + \"b\"", None, &[]).unwrap();
    match result {
      Value::Str(s) => assert_eq!(&*s, "ab"),
      other => panic!("expected a string, got {:?}", other),
    }
  }

  #[test]
  fn division_by_zero_is_an_invocation_error() {
    let interpreter = Interpreter::new(InterpreterOptions::standard());
    let err = interpreter.eval("1 / 0", None, &[]).unwrap_err();
    assert!(err.to_string().contains("division"));
  }

  #[test]
  fn declared_parameters_round_trip_through_used_parameters() {
    let interpreter = Interpreter::new(InterpreterOptions::standard());
    let declared = vec![Parameter::new("a", int_type()), Parameter::new("b", int_type())];
    let lambda = interpreter.parse("a + 1", None, &declared).unwrap();

    let used_names: Vec<&str> = lambda.used_parameters().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(used_names, vec!["a"]);
    assert_eq!(lambda.declared_parameters().len(), 2);
  }

  #[test]
  fn assigning_to_a_declared_parameter_is_a_parse_error() {
    let mut interpreter = Interpreter::new(InterpreterOptions::standard());
    interpreter.set_assignment_policy(AssignmentPolicy::EqualOnly);
    let declared = vec![Parameter::new("a", int_type())];
    assert!(interpreter.parse("a = 5", None, &declared).is_err());
  }

  #[test]
  fn assignment_is_rejected_by_default() {
    let interpreter = Interpreter::new(InterpreterOptions::standard());
    let declared = vec![Parameter::new("a", int_type())];
    assert!(interpreter.parse("a = 5", None, &declared).is_err());
  }

  #[test]
  fn argument_count_mismatch_is_an_invocation_error() {
    let interpreter = Interpreter::new(InterpreterOptions::standard());
    let declared = vec![Parameter::new("a", int_type())];
    let lambda = interpreter.parse("a + 1", None, &declared).unwrap();
    assert!(lambda.invoke(&[]).is_err());
  }

  #[test]
  fn round_trip_compile_then_invoke_matches_direct_host_binding() {
    let interpreter = Interpreter::new(InterpreterOptions::standard());
    let declared = vec![Parameter::new("a", int_type()), Parameter::new("b", int_type())];
    let lambda = interpreter.parse("a * b + 1", None, &declared).unwrap();

    let a = 6i32;
    let b = 7i32;
    let expected = a * b + 1;
    let result = lambda
      .invoke(&[Value::I32(a).into_dyn(), Value::I32(b).into_dyn()])
      .unwrap();
    assert!(matches!(result, Value::I32(v) if v == expected));
  }

  #[test]
  fn registered_variable_identifier_reads_its_current_value() {
    let mut interpreter = Interpreter::new(InterpreterOptions::standard());
    let cell = Arc::new(RwLock::new(Value::I32(10).into_dyn()));
    interpreter
      .register_identifier("counter", int_type(), IdentifierBinding::Variable(cell.clone()))
      .unwrap();

    let result = interpreter.eval("counter + 1", None, &[]).unwrap();
    assert!(matches!(result, Value::I32(11)));

    *cell.write().unwrap() = Value::I32(100).into_dyn();
    let result = interpreter.eval("counter + 1", None, &[]).unwrap();
    assert!(matches!(result, Value::I32(101)));
  }

  #[test]
  fn idempotent_reregistration_of_an_identifier() {
    let mut interpreter = Interpreter::new(InterpreterOptions::standard());
    interpreter
      .register_identifier("x", int_type(), IdentifierBinding::Constant(Value::I32(1).into_dyn()))
      .unwrap();
    interpreter
      .register_identifier("x", string_type(), IdentifierBinding::Constant(Value::str("hi").into_dyn()))
      .unwrap();

    let result = interpreter.eval("x", None, &[]).unwrap();
    match result {
      Value::Str(s) => assert_eq!(&*s, "hi"),
      other => panic!("expected the second registration to win, got {:?}", other),
    }
  }

  // ---- dynamic dispatch scenarios ------------------------------------

  #[test]
  fn property_read_on_a_dynamic_bag() {
    let bag = bag_value(vec![("Foo", Value::str("bar").into_dyn())]);
    let interpreter = interpreter_with_bag(bag);
    let result = interpreter.eval("dyn.Foo", None, &[]).unwrap();
    match result {
      Value::Str(s) => assert_eq!(&*s, "bar"),
      other => panic!("expected a string, got {:?}", other),
    }
  }

  #[test]
  fn nested_dynamic_member_access() {
    let sub = bag_value(vec![("Foo", Value::str("bar").into_dyn())]);
    let outer = bag_value(vec![("Sub", sub)]);
    let interpreter = interpreter_with_bag(outer);

    let result = interpreter.eval("dyn.Sub.Foo", None, &[]).unwrap();
    match result {
      Value::Str(s) => assert_eq!(&*s, "bar"),
      other => panic!("expected a string, got {:?}", other),
    }
  }

  #[test]
  fn static_member_takes_precedence_over_a_dynamic_member_of_the_same_name() {
    let bag = bag_value(vec![
      ("__real_property__", Value::str("bar").into_dyn()),
      ("RealProperty", Value::str("shadowed").into_dyn()),
    ]);
    let interpreter = interpreter_with_bag(bag);

    let result = interpreter.eval("dyn.RealProperty", None, &[]).unwrap();
    match result {
      Value::Str(s) => assert_eq!(&*s, "bar"),
      other => panic!("expected the static member's value, got {:?}", other),
    }
  }

  #[test]
  fn dynamic_method_invocation() {
    let callable: DynValue = Arc::new(StubCallable(Box::new(|_args| Value::str("bar").into_dyn())));
    let bag = bag_value(vec![("Foo", callable)]);
    let interpreter = interpreter_with_bag(bag);

    let result = interpreter.eval("dyn.Foo()", None, &[]).unwrap();
    match result {
      Value::Str(s) => assert_eq!(&*s, "bar"),
      other => panic!("expected a string, got {:?}", other),
    }
  }

  #[test]
  fn static_method_takes_precedence_over_dynamic_dispatch() {
    let bag = bag_value(vec![]);
    let interpreter = interpreter_with_bag(bag);

    let result = interpreter.eval("dyn.ToString()", None, &[]).unwrap();
    match result {
      Value::Str(s) => assert_eq!(&*s, "a bag"),
      other => panic!("expected the static ToString() result, got {:?}", other),
    }
  }

  #[test]
  fn case_mismatch_on_a_dynamic_member_is_a_dynamic_binding_error() {
    let bag = bag_value(vec![("Bar", Value::I32(10).into_dyn())]);
    let interpreter = interpreter_with_bag(bag);

    let err = interpreter.eval("dyn.BAR", None, &[]).unwrap_err();
    assert!(err.to_string().to_lowercase().contains("dynamic member"));

    let dynexpr::EvalError::Invocation(invocation) = err else {
      panic!("expected an invocation error");
    };
    assert_eq!(invocation.diagnostic.code, dynexpr::DiagnosticCode::DynamicMemberCaseMismatch);
    assert!(invocation.diagnostic.message.contains("Bar"));
  }

  #[test]
  fn genuinely_missing_dynamic_member_keeps_the_generic_not_found_code() {
    let bag = bag_value(vec![("Bar", Value::I32(10).into_dyn())]);
    let interpreter = interpreter_with_bag(bag);

    let err = interpreter.eval("dyn.Quux", None, &[]).unwrap_err();
    let dynexpr::EvalError::Invocation(invocation) = err else {
      panic!("expected an invocation error");
    };
    assert_eq!(invocation.diagnostic.code, dynexpr::DiagnosticCode::DynamicMemberNotFound);
  }

  #[test]
  fn host_identifier_compared_against_null_evaluates_to_false_not_an_error() {
    let bag = bag_value(vec![]);
    let interpreter = interpreter_with_bag(bag);

    let result = interpreter.eval("dyn == null", None, &[]).unwrap();
    assert!(matches!(result, Value::Bool(false)));

    let result = interpreter.eval("dyn != null", None, &[]).unwrap();
    assert!(matches!(result, Value::Bool(true)));
  }

  #[test]
  fn case_insensitive_interpreter_still_enforces_case_sensitive_dynamic_lookup() {
    let mut interpreter = Interpreter::new(InterpreterOptions {
      case_insensitive: true,
      ..InterpreterOptions::standard()
    });
    interpreter.register_type("Bag", bag_type()).unwrap();
    let bag = bag_value(vec![("Bar", Value::I32(10).into_dyn())]);
    interpreter
      .register_identifier("dyn", bag_type(), IdentifierBinding::Constant(bag))
      .unwrap();

    // Static lookups fold case under this registry...
    assert!(interpreter.eval("DYN.Bar", None, &[]).is_ok());
    // ...but the dynamic member surface never does.
    assert!(interpreter.eval("DYN.BAR", None, &[]).is_err());
  }

  #[test]
  fn detect_classifies_parameters_identifiers_and_types() {
    let mut interpreter = Interpreter::new(InterpreterOptions::standard());
    interpreter
      .register_identifier("counter", int_type(), IdentifierBinding::Constant(Value::I32(1).into_dyn()))
      .unwrap();

    let info = interpreter.detect("counter + int.whatever + mystery");
    assert!(info.identifiers.contains(&"counter".to_string()));
    assert!(info.types.contains(&"int".to_string()));
    assert!(info.unknown_identifiers.contains(&"mystery".to_string()));
  }

  #[test]
  fn constructing_a_thousand_interpreters_completes_in_interactive_time() {
    let start = std::time::Instant::now();
    for _ in 0..1000 {
      let _ = Interpreter::new(InterpreterOptions::standard());
    }
    assert!(start.elapsed().as_millis() < 1000);
  }
}
