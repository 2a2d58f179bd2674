use intcode::{Fault, Machine, MachineConfig, RunState, Step, Word};

fn machine(program: &[Word]) -> Machine {
  Machine::new(program.to_vec(), MachineConfig::named("test"))
}

fn run_to_end(program: &[Word], inputs: &[Word]) -> Vec<Word> {
  let mut m = machine(program);
  m.io().feed_all(inputs.iter().copied()).unwrap();
  assert_eq!(m.run().unwrap(), RunState::Ended);
  m.output().unwrap()
}

#[test]
fn quine_outputs_itself() {
  let quine = vec![109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99];
  assert_eq!(run_to_end(&quine, &[]), quine);
}

#[test]
fn immediate_operand_multiplies_into_memory() {
  let mut m = machine(&[1002, 4, 3, 4, 33]);
  assert_eq!(m.step().unwrap(), Step::Continue);
  assert_eq!(m.peek(4), 99);
  assert_eq!(m.step().unwrap(), Step::Ended);
  assert_eq!(m.state(), RunState::Ended);
}

#[test]
fn comparison_against_eight() {
  let program = [3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8];
  assert_eq!(run_to_end(&program, &[8]), vec![1]);
  assert_eq!(run_to_end(&program, &[7]), vec![0]);

  // Immediate mode variant of the same test.
  let program = [3, 3, 1107, -1, 8, 3, 4, 3, 99];
  assert_eq!(run_to_end(&program, &[5]), vec![1]);
  assert_eq!(run_to_end(&program, &[9]), vec![0]);
}

#[test]
fn jumps_select_on_zero() {
  let program = [3, 12, 6, 12, 15, 1, 13, 14, 13, 4, 13, 99, -1, 0, 1, 9];
  assert_eq!(run_to_end(&program, &[0]), vec![0]);
  assert_eq!(run_to_end(&program, &[3]), vec![1]);
}

#[test]
fn programs_may_rewrite_themselves() {
  // Writes 99 over its own fifth word, then executes it.
  let mut m = machine(&[1101, 100, -1, 4, 0]);
  assert_eq!(m.run().unwrap(), RunState::Ended);
  assert_eq!(m.memory().as_slice(), &[1101, 100, -1, 4, 99]);
}

#[test]
fn memory_grows_on_demand() {
  let mut m = machine(&[1101, 2, 3, 1000, 4, 1000, 99]);
  assert_eq!(m.run().unwrap(), RunState::Ended);
  assert_eq!(m.output().unwrap(), vec![5]);
  assert_eq!(m.memory().len(), 1001);
  assert_eq!(m.peek(999), 0);
}

#[test]
fn reads_past_the_end_are_zero() {
  assert_eq!(run_to_end(&[4, 50, 99], &[]), vec![0]);
}

#[test]
fn relative_base_accumulates() {
  // The base moves by 5 and then 7; `204,-2` outputs M[10].
  let mut m = machine(&[109, 5, 109, 7, 204, -2, 99, 0, 0, 0, 42]);
  assert_eq!(m.run().unwrap(), RunState::Ended);
  assert_eq!(m.relative_base(), 12);
  assert_eq!(m.output().unwrap(), vec![42]);
}

#[test]
fn relative_mode_stores() {
  // Reads input into M[rb + 3] with the base at 7.
  let mut m = machine(&[109, 7, 203, 3, 4, 10, 99, 0, 0, 0, 0]);
  m.io().feed(-17).unwrap();
  assert_eq!(m.run().unwrap(), RunState::Ended);
  assert_eq!(m.output().unwrap(), vec![-17]);
}

#[test]
fn handles_large_numbers() {
  assert_eq!(run_to_end(&[104, 1125899906842624, 99], &[]), vec![1125899906842624]);
  assert_eq!(run_to_end(&[1102, 34915192, 34915192, 7, 4, 7, 99, 0], &[]), vec![1219070632396864]);
}

#[test]
fn arithmetic_wraps() {
  assert_eq!(run_to_end(&[1101, Word::MAX, 1, 7, 4, 7, 99, 0], &[]), vec![Word::MIN]);
}

#[test]
fn feeding_ahead_matches_feeding_on_demand() {
  // Outputs the running sum of three inputs after each one.
  let program = [3, 20, 1, 20, 21, 21, 4, 21, 1001, 22, 1, 22, 1008, 22, 3, 23, 1006, 23, 0, 99];
  let inputs  = [4, -9, 30];

  let ahead = run_to_end(&program, &inputs);

  let mut m = machine(&program);
  let mut on_demand = vec![];
  assert_eq!(m.run().unwrap(), RunState::AwaitingInput);
  for &input in &inputs {
    on_demand.extend(m.run_with(&[input]).unwrap());
  }

  assert_eq!(ahead, vec![4, -5, 25]);
  assert_eq!(on_demand, ahead);
  assert_eq!(m.state(), RunState::Ended);
}

#[test]
fn suspended_machines_do_not_count_the_input_step() {
  let mut m = machine(&[3, 5, 4, 5, 99, 0]);
  m.run().unwrap();
  m.resume().unwrap();
  m.resume().unwrap();
  assert_eq!(m.steps(), 0);
  m.io().feed(1).unwrap();
  m.resume().unwrap();
  assert_eq!(m.steps(), 3);
}

#[test]
fn unknown_opcodes_fault() {
  let mut m = machine(&[1101, 1, 1, 5, 12, 0]);
  let error = m.run().unwrap_err();
  assert_eq!(error.fault(), Some(Fault::UnknownOpcode(12)));
  assert_eq!(m.state(), RunState::Halted);
  assert!(error.to_string().contains("test"));
}

#[test]
fn empty_programs_run_off_the_end() {
  let mut m = machine(&[]);
  assert_eq!(m.run().unwrap_err().fault(), Some(Fault::RanOffEnd));
}

#[test]
fn programs_load_from_text() {
  let mut m = Machine::from_text("1,9,10,3,2,3,11,0,99,30,40,50\n", MachineConfig::default()).unwrap();
  assert_eq!(m.run().unwrap(), RunState::Ended);
  assert_eq!(m.peek(0), 3500);
  assert!(Machine::from_text("1,,2", MachineConfig::default()).is_err());
}

#[test]
fn memory_listings_render() {
  let mut m = machine(&[1002, 4, 3, 4, 33]);
  m.run().unwrap();
  assert!(m.dump().contains("M[4] ="));
  assert!(m.dump_range(0..2).contains("1002"));
  assert!(m.to_string().contains("Registers"));
}

#[test]
fn far_addresses_are_faults() {
  let mut m = machine(&[4, Word::MAX, 99]);
  assert_eq!(m.run().unwrap_err().fault(), Some(Fault::AddressOutOfRange(Word::MAX)));
  assert_eq!(m.state(), RunState::Halted);
}
