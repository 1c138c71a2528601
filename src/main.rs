fn main() -> anyhow::Result<()> {
    memo_board::cli::run()
}
