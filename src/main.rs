fn main() -> std::process::ExitCode {
    todo_list_lib::run()
}
