//! End-to-end scenarios and testable properties for the signal tree, codec,
//! and subscription bus.

use std::cell::RefCell;
use std::rc::Rc;

use vsd_common::{Value, VsdErrorKind};
use vsd_tree::builder::{BuilderConfig, TreeBuilder};
use vsd_tree::transport::MemoryTransport;
use vsd_tree::Context;

const SPEC: &str = "\
Vehicle,1,branch,none,,,,,,
Vehicle.Speed,101,sensor,u16,,,,,,
Vehicle.Drivetrain,10,branch,none,,,,,,
Vehicle.Drivetrain.Engine,11,branch,none,,,,,,
Vehicle.Drivetrain.Engine.RPM,110,sensor,u32,rpm,0,8000,,,true
Vehicle.Cabin,20,branch,none,,,,,,
Vehicle.Cabin.Door,21,branch,none,,,,,,
Vehicle.Cabin.Door.Row1,22,branch,none,,,,,,
Vehicle.Cabin.Door.Row1.Left,23,branch,none,,,,,,
Vehicle.Cabin.Door.Row1.Left.IsLocked,230,actuator,bool,,,,,,
Vehicle.Cabin.Door.Row1.Left.Window,24,branch,none,,,,,,
Vehicle.Cabin.Door.Row1.Left.Window.Position,240,actuator,u8,,,,,,
Vehicle.Diag,30,branch,none,,,,,,
Vehicle.Diag.Temp,300,sensor,i8,,,,,,
Vehicle.Diag.Altitude,301,sensor,i16,,,,,,
Vehicle.Diag.Odometer,302,sensor,i32,,,,,,
Vehicle.Diag.FuelLevel,303,sensor,f32,,,,,,
Vehicle.Diag.Voltage,304,sensor,f64,,,,,,
";

fn build() -> Context {
    TreeBuilder::new(BuilderConfig::default())
        .load_str(SPEC)
        .expect("valid spec")
        .finish()
        .expect("buildable tree")
}

/// S1: publish a single leaf, receiver's subscriber on that exact leaf fires.
#[test]
fn s1_single_leaf_publish() {
    let mut a = build();
    let mut b = build();
    let mut transport = MemoryTransport::new();

    let received = Rc::new(RefCell::new(None));
    let received_clone = received.clone();
    let speed_b = b.lookup_by_path("Vehicle.Speed").unwrap();
    b.subscribe(speed_b, move |ctx, touched| {
        assert_eq!(touched.len(), 1);
        *received_clone.borrow_mut() = ctx.current_value(touched[0]).ok().cloned();
    });

    let speed_a = a.lookup_by_path("Vehicle.Speed").unwrap();
    a.set_u16(speed_a, 42).unwrap();
    a.publish(speed_a, &mut transport).unwrap();

    let (tag, bytes) = transport.pop().unwrap();
    b.on_receive(tag, &bytes).unwrap();

    assert_eq!(*received.borrow(), Some(Value::U16(42)));
}

/// S2: publish a branch with two leaves; an ancestor subscriber sees both, in pre-order.
#[test]
fn s2_branch_publish_reaches_ancestor_in_preorder() {
    let mut a = build();
    let mut b = build();
    let mut transport = MemoryTransport::new();

    let seen_paths = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen_paths.clone();
    let cabin_b = b.lookup_by_path("Vehicle.Cabin").unwrap();
    b.subscribe(cabin_b, move |ctx, touched| {
        let paths: Vec<String> = touched.iter().map(|&id| ctx.path_of(id).to_string()).collect();
        *seen_clone.borrow_mut() = paths;
    });

    let locked = a.lookup_by_path("Vehicle.Cabin.Door.Row1.Left.IsLocked").unwrap();
    let position = a.lookup_by_path("Vehicle.Cabin.Door.Row1.Left.Window.Position").unwrap();
    a.set_bool(locked, true).unwrap();
    a.set_u8(position, 75).unwrap();

    let left_door = a.lookup_by_path("Vehicle.Cabin.Door.Row1.Left").unwrap();
    a.publish(left_door, &mut transport).unwrap();

    let (tag, bytes) = transport.pop().unwrap();
    b.on_receive(tag, &bytes).unwrap();

    assert_eq!(
        *seen_paths.borrow(),
        vec![
            "Vehicle.Cabin.Door.Row1.Left.IsLocked".to_string(),
            "Vehicle.Cabin.Door.Row1.Left.Window.Position".to_string(),
        ]
    );
}

/// S3: type mismatch on a typed setter is invalid-argument.
#[test]
fn s3_type_mismatch_is_invalid_argument() {
    let mut a = build();
    let speed = a.lookup_by_path("Vehicle.Speed").unwrap();
    let err = a.set_u8(speed, 3).unwrap_err();
    assert_eq!(err.kind(), VsdErrorKind::InvalidArgument);
}

/// S4: a scalar setter addressing a branch is is-a-directory.
#[test]
fn s4_setter_on_branch_is_a_directory() {
    let mut a = build();
    let cabin = a.lookup_by_path("Vehicle.Cabin").unwrap();
    let err = a.set_u16(cabin, 0).unwrap_err();
    assert_eq!(err.kind(), VsdErrorKind::IsADirectory);
}

/// S5: lookup failure modes.
#[test]
fn s5_lookup_failure_modes() {
    let a = build();
    assert_eq!(a.lookup_by_path("Vehicle.Nonexistent").unwrap_err().kind(), VsdErrorKind::NotFound);
    assert_eq!(a.lookup_by_path("Vehicle.Speed.Nope").unwrap_err().kind(), VsdErrorKind::NotADirectory);
}

/// S6: subscriber ordering and unsubscribe semantics (P4).
#[test]
fn s6_subscriber_order_and_unsubscribe() {
    let mut a = build();
    let mut b = build();
    let mut transport = MemoryTransport::new();

    let order = Rc::new(RefCell::new(Vec::new()));
    let drivetrain = b.lookup_by_path("Vehicle.Drivetrain").unwrap();

    let order1 = order.clone();
    let c1 = b.subscribe(drivetrain, move |_, _| order1.borrow_mut().push(1));
    let order2 = order.clone();
    b.subscribe(drivetrain, move |_, _| order2.borrow_mut().push(2));

    let rpm_a = a.lookup_by_path("Vehicle.Drivetrain.Engine.RPM").unwrap();
    a.set_u32(rpm_a, 1500).unwrap();
    a.publish(rpm_a, &mut transport).unwrap();
    let (tag, bytes) = transport.pop().unwrap();
    b.on_receive(tag, &bytes).unwrap();
    assert_eq!(*order.borrow(), vec![1, 2]);

    b.unsubscribe(drivetrain, c1).unwrap();
    order.borrow_mut().clear();

    a.set_u32(rpm_a, 1600).unwrap();
    a.publish(rpm_a, &mut transport).unwrap();
    let (tag, bytes) = transport.pop().unwrap();
    b.on_receive(tag, &bytes).unwrap();
    assert_eq!(*order.borrow(), vec![2]);
}

/// P1: round-trip for every data kind present in the fixture.
#[test]
fn p1_round_trip_every_data_kind() {
    let mut a = build();
    let mut b = build();
    let mut transport = MemoryTransport::new();

    let rpm_a = a.lookup_by_path("Vehicle.Drivetrain.Engine.RPM").unwrap();
    let locked_a = a.lookup_by_path("Vehicle.Cabin.Door.Row1.Left.IsLocked").unwrap();
    let position_a = a.lookup_by_path("Vehicle.Cabin.Door.Row1.Left.Window.Position").unwrap();
    let temp_a = a.lookup_by_path("Vehicle.Diag.Temp").unwrap();
    let altitude_a = a.lookup_by_path("Vehicle.Diag.Altitude").unwrap();
    let odometer_a = a.lookup_by_path("Vehicle.Diag.Odometer").unwrap();
    let fuel_a = a.lookup_by_path("Vehicle.Diag.FuelLevel").unwrap();
    let voltage_a = a.lookup_by_path("Vehicle.Diag.Voltage").unwrap();

    a.set_u32(rpm_a, 4200).unwrap();
    a.set_bool(locked_a, true).unwrap();
    a.set_u8(position_a, 9).unwrap();
    a.set_i8(temp_a, -40).unwrap();
    a.set_i16(altitude_a, -1200).unwrap();
    a.set_i32(odometer_a, 123_456).unwrap();
    a.set_f32(fuel_a, 0.375).unwrap();
    a.set_f64(voltage_a, 13.8).unwrap();

    a.publish(a.root(), &mut transport).unwrap();
    let (tag, bytes) = transport.pop().unwrap();
    b.on_receive(tag, &bytes).unwrap();

    let rpm_b = b.lookup_by_path("Vehicle.Drivetrain.Engine.RPM").unwrap();
    let locked_b = b.lookup_by_path("Vehicle.Cabin.Door.Row1.Left.IsLocked").unwrap();
    let position_b = b.lookup_by_path("Vehicle.Cabin.Door.Row1.Left.Window.Position").unwrap();
    let temp_b = b.lookup_by_path("Vehicle.Diag.Temp").unwrap();
    let altitude_b = b.lookup_by_path("Vehicle.Diag.Altitude").unwrap();
    let odometer_b = b.lookup_by_path("Vehicle.Diag.Odometer").unwrap();
    let fuel_b = b.lookup_by_path("Vehicle.Diag.FuelLevel").unwrap();
    let voltage_b = b.lookup_by_path("Vehicle.Diag.Voltage").unwrap();
    assert_eq!(b.current_value(rpm_b).unwrap(), &Value::U32(4200));
    assert_eq!(b.current_value(locked_b).unwrap(), &Value::Bool(true));
    assert_eq!(b.current_value(position_b).unwrap(), &Value::U8(9));
    assert_eq!(b.current_value(temp_b).unwrap(), &Value::I8(-40));
    assert_eq!(b.current_value(altitude_b).unwrap(), &Value::I16(-1200));
    assert_eq!(b.current_value(odometer_b).unwrap(), &Value::I32(123_456));
    assert_eq!(b.current_value(fuel_b).unwrap(), &Value::F32(0.375));
    assert_eq!(b.current_value(voltage_b).unwrap(), &Value::F64(13.8));
}

/// P3: a subscription on a non-ancestor never fires for an unrelated payload.
#[test]
fn p3_non_ancestor_does_not_fire() {
    let mut a = build();
    let mut b = build();
    let mut transport = MemoryTransport::new();

    let fired = Rc::new(RefCell::new(false));
    let fired_clone = fired.clone();
    let cabin = b.lookup_by_path("Vehicle.Cabin").unwrap();
    b.subscribe(cabin, move |_, _| *fired_clone.borrow_mut() = true);

    let speed_a = a.lookup_by_path("Vehicle.Speed").unwrap();
    a.set_u16(speed_a, 1).unwrap();
    a.publish(speed_a, &mut transport).unwrap();
    let (tag, bytes) = transport.pop().unwrap();
    b.on_receive(tag, &bytes).unwrap();

    assert!(!*fired.borrow());
}

/// P5: `lookup_by_path(path_of(n)) == n` for every node in the fixture.
#[test]
fn p5_path_of_round_trips_through_lookup() {
    let a = build();
    for path in [
        "Vehicle",
        "Vehicle.Speed",
        "Vehicle.Drivetrain.Engine.RPM",
        "Vehicle.Cabin.Door.Row1.Left.Window.Position",
    ] {
        let node = a.lookup_by_path(path).unwrap();
        assert_eq!(a.path_of(node).as_str(), path);
    }
}

/// P6: duplicate numeric ids are rejected at construction.
#[test]
fn p6_duplicate_id_rejected() {
    let csv = "Vehicle,1,branch,none,,,,,,\nVehicle.A,5,sensor,u8,,,,,,\nVehicle.B,5,sensor,u8,,,,,,\n";
    let err = TreeBuilder::new(BuilderConfig::default()).load_str(csv).unwrap_err();
    assert_eq!(err.kind(), VsdErrorKind::DuplicateId);
}

/// P8: publishing the same values twice produces byte-identical payloads.
#[test]
fn p8_duplicate_publish_is_byte_identical() {
    let a = build();
    let root = a.root();
    let mut first = Vec::new();
    let mut second = Vec::new();
    vsd_tree::codec::encode(&a, root, &mut first, vsd_tree::codec::MAX_PAYLOAD).unwrap();
    vsd_tree::codec::encode(&a, root, &mut second, vsd_tree::codec::MAX_PAYLOAD).unwrap();
    assert_eq!(first, second);
}
