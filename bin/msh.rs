fn main() {
    msh::msh_main()
}
